//! Parallel frequency aggregation.
//!
//! A producer feeds lines into a bounded queue; a fixed pool of worker threads
//! drains it, each counting into a private [`FrequencyTable`]. Once the
//! producer is done the queue is closed, workers exit after it runs dry, and
//! their tables are merged by addition. Nothing is shared between workers
//! while counting.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};

use super::{FrequencyError, FrequencyTable};
use crate::constants::{DEFAULT_POLL_TIMEOUT, DEFAULT_QUEUE_CAPACITY};
use crate::tokenizer::Tokenize;
use crate::types::NgramKind;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Number of worker threads, one per core by default.
    pub workers: usize,
    /// Pending lines the producer may enqueue before it blocks.
    pub queue_capacity: usize,
    #[serde(with = "crate::util::millis")]
    pub poll_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> AggregatorConfig {
        AggregatorConfig {
            workers: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

pub struct Aggregator {
    kind: NgramKind,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(kind: NgramKind, config: AggregatorConfig) -> Aggregator {
        Aggregator { kind, config }
    }

    pub fn kind(&self) -> NgramKind {
        self.kind
    }

    /// Aggregates lines produced by an in-memory iterator.
    pub fn aggregate_lines<I, S>(&self, lines: I) -> Result<FrequencyTable, FrequencyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run(|tx| {
            for line in lines {
                if tx.send(line.into()).is_err() {
                    break;
                }
            }
            Ok(())
        })
    }

    /// Aggregates every line of a text.
    pub fn aggregate_text(&self, text: &str) -> Result<FrequencyTable, FrequencyError> {
        self.aggregate_lines(text.lines())
    }

    /// Aggregates every line of every file, read in the given order.
    pub fn aggregate_files<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> Result<FrequencyTable, FrequencyError> {
        self.run(|tx| {
            for path in paths {
                let path = path.as_ref();
                log::debug!("Begin read {}.", path.display());
                let reader = BufReader::new(File::open(path)?);
                if !feed_reader(reader, tx)? {
                    break;
                }
                log::debug!("File {} successfully read.", path.display());
            }
            log::debug!("All files successfully read.");
            Ok(())
        })
    }

    fn run<F>(&self, produce: F) -> Result<FrequencyTable, FrequencyError>
    where
        F: FnOnce(&Sender<String>) -> Result<(), FrequencyError>,
    {
        let begin = Instant::now();
        let worker_count = self.config.workers.max(1);
        let (tx, rx) = bounded::<String>(self.config.queue_capacity.max(1));

        let mut handles = Vec::with_capacity(worker_count);
        for worker_idx in 0..worker_count {
            let rx = rx.clone();
            let kind = self.kind;
            let poll_timeout = self.config.poll_timeout;

            let handle = thread::Builder::new()
                .name(format!("aggregate-worker-{}", worker_idx))
                .spawn(move || count_worker(rx, kind, poll_timeout))?;
            handles.push(handle);
        }
        drop(rx);

        let produced = produce(&tx);
        // Closing the queue is the end-of-input signal.
        drop(tx);

        log::debug!("Every line has been queued. Waiting for workers...");

        let mut merged = FrequencyTable::new();
        let mut panicked = None;
        for (worker_idx, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(table) => merged.merge(table),
                Err(_) => {
                    log::error!("aggregate-worker-{} panicked", worker_idx);
                    panicked.get_or_insert(worker_idx);
                }
            }
        }

        produced?;
        if let Some(worker_idx) = panicked {
            return Err(FrequencyError::WorkerPanicked(worker_idx));
        }

        log::debug!(
            "Aggregated {} distinct {} ({} total) in {:?}.",
            merged.len(),
            self.kind,
            merged.total(),
            begin.elapsed()
        );

        Ok(merged)
    }
}

/// Pushes every decodable line of `reader` into the queue, blocking while it
/// is full. Returns `false` if every worker has gone away.
fn feed_reader<R: BufRead>(mut reader: R, tx: &Sender<String>) -> Result<bool, FrequencyError> {
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(true);
        }
        line_no += 1;

        match String::from_utf8(std::mem::take(&mut buf)) {
            Ok(line) => {
                if tx.send(line).is_err() {
                    return Ok(false);
                }
            }
            Err(e) => {
                log::warn!("Skipping line {}: {}", line_no, e);
                buf = e.into_bytes();
            }
        }
    }
}

fn count_worker(rx: Receiver<String>, kind: NgramKind, poll_timeout: Duration) -> FrequencyTable {
    let mut table = FrequencyTable::new();

    loop {
        match rx.recv_timeout(poll_timeout) {
            Ok(line) => {
                if !absorb_line(&mut table, || line.ngrams(kind).collect()) {
                    log::warn!("Dropping line that could not be counted: {:?}", line);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    table
}

/// Counts the keys produced by `keys`. A panic while producing them drops
/// the whole line, leaving `table` untouched, and returns `false`.
fn absorb_line<F>(table: &mut FrequencyTable, keys: F) -> bool
where
    F: FnOnce() -> Vec<String>,
{
    match panic::catch_unwind(AssertUnwindSafe(keys)) {
        Ok(keys) => {
            for key in keys {
                table.add(&key, 1);
            }
            true
        }
        Err(_) => false,
    }
}
