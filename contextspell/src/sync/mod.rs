//! Keeps the frequency stores in step with a live wiki.
//!
//! Each cycle reads the checkpoint, asks the change feed for newer changes
//! and fetches both revisions of every edit. Old and new revisions are put
//! into two markup documents, turned into plain text by the extractor and
//! aggregated into unigram and bigram tables. The signed difference of the
//! tables is added to the stores key by key with compare-and-swap, the stores
//! are flushed, and only then is the new checkpoint written. Any failure on
//! the way leaves the checkpoint where it was, so the cycle is redone on the
//! next tick.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};

use crate::constants::SYNC_INTERVAL;
use crate::frequency::{Aggregator, AggregatorConfig};
use crate::store::{FrequencyStore, RetryPolicy};
use crate::types::NgramKind;

pub mod checkpoint;
pub mod delta;
pub mod error;
pub mod extractor;
pub mod mediawiki;
pub mod source;

pub use self::checkpoint::{Checkpoint, CheckpointFile, StoreLocation};
pub use self::delta::{DeltaRecord, DeltaSet};
pub use self::error::SyncError;
pub use self::extractor::{CommandExtractor, MarkupDocument};
pub use self::mediawiki::MediaWiki;
pub use self::source::{ChangeFeed, ChangeKind, RecentChange, Revision, RevisionSource, TextExtractor};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Minimum time between the starts of two cycles.
    #[serde(with = "crate::util::millis")]
    pub interval: Duration,
    /// Wiki namespace to follow, 0 being articles.
    pub namespace: i64,
    /// Wiki root written into the markup documents.
    pub site: String,
    pub checkpoint_path: PathBuf,
    /// Recorded in the checkpoint next to the progress.
    pub store: StoreLocation,
    pub retry: RetryPolicy,
    pub aggregator: AggregatorConfig,
}

impl Default for UpdaterConfig {
    fn default() -> UpdaterConfig {
        UpdaterConfig {
            interval: SYNC_INTERVAL,
            namespace: 0,
            site: String::new(),
            checkpoint_path: PathBuf::from("sync-checkpoint.json"),
            store: StoreLocation::default(),
            retry: RetryPolicy::default(),
            aggregator: AggregatorConfig::default(),
        }
    }
}

/// What a cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Changes returned by the feed.
    pub changes: usize,
    /// Edits whose revisions were absorbed.
    pub edits: usize,
    /// Changes passed over: not edits, or with a revision gone.
    pub skipped: usize,
    pub unigram_deltas: usize,
    pub bigram_deltas: usize,
    /// The checkpoint written at the end, if any.
    pub checkpoint: Option<Checkpoint>,
}

pub struct Updater<F, R, X> {
    feed: F,
    revisions: R,
    extractor: X,
    unigrams: Arc<dyn FrequencyStore>,
    bigrams: Arc<dyn FrequencyStore>,
    checkpoints: CheckpointFile,
    config: UpdaterConfig,
}

impl<F, R, X> Updater<F, R, X>
where
    F: ChangeFeed,
    R: RevisionSource,
    X: TextExtractor,
{
    pub fn new(
        feed: F,
        revisions: R,
        extractor: X,
        unigrams: Arc<dyn FrequencyStore>,
        bigrams: Arc<dyn FrequencyStore>,
        config: UpdaterConfig,
    ) -> Updater<F, R, X> {
        Updater {
            feed,
            revisions,
            extractor,
            unigrams,
            bigrams,
            checkpoints: CheckpointFile::new(config.checkpoint_path.clone()),
            config,
        }
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Runs cycles until `shutdown` receives a message or is disconnected.
    ///
    /// A failed cycle is logged and retried on the next tick. The wait between
    /// cycles is cut short by a shutdown request.
    pub fn run(&self, shutdown: &Receiver<()>) {
        loop {
            let begin = Instant::now();
            match self.run_cycle() {
                Ok(report) if report.changes > 0 => log::info!(
                    "Sync cycle done: {} changes, {} edits, {} skipped, {} + {} deltas",
                    report.changes,
                    report.edits,
                    report.skipped,
                    report.unigram_deltas,
                    report.bigram_deltas
                ),
                Ok(_) => log::debug!("No new changes"),
                Err(e) => log::warn!("Sync cycle failed, retrying next time: {}", e),
            }

            let remaining = self.config.interval.saturating_sub(begin.elapsed());
            match shutdown.recv_timeout(remaining) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    log::info!("Shutting down the updater");
                    return;
                }
            }
        }
    }

    /// One full cycle.
    pub fn run_cycle(&self) -> Result<CycleReport, SyncError> {
        let current = self.checkpoints.load()?;
        let changes = self.feed.recent_changes(&current, self.config.namespace)?;

        let mut report = CycleReport {
            changes: changes.len(),
            ..CycleReport::default()
        };
        if changes.is_empty() {
            return Ok(report);
        }

        let mut candidate = current;
        candidate.store = self.config.store.clone();
        let mut old_document = MarkupDocument::new(&self.config.site);
        let mut new_document = MarkupDocument::new(&self.config.site);

        for change in &changes {
            candidate.advance(change);

            if change.kind != ChangeKind::Edit {
                log::debug!("Skipping change {} ({:?})", change.rcid, change.kind);
                report.skipped += 1;
                continue;
            }

            match self.revisions.revision_pair(change)? {
                Some(pair) => {
                    old_document.push(pair.old);
                    new_document.push(pair.new);
                    report.edits += 1;
                }
                None => {
                    log::warn!(
                        "Ignoring revisions {} and {} of change {} (not available)",
                        change.revid,
                        change.old_revid,
                        change.rcid
                    );
                    report.skipped += 1;
                }
            }
        }

        if !new_document.is_empty() {
            let old_text = self.extractor.extract(&old_document)?;
            let new_text = self.extractor.extract(&new_document)?;

            let unigrams = self.deltas(NgramKind::Unigrams, &old_text, &new_text)?;
            let bigrams = self.deltas(NgramKind::Bigrams, &old_text, &new_text)?;

            let retry = &self.config.retry;
            report.unigram_deltas = unigrams.apply(self.unigrams.as_ref(), retry)?;
            report.bigram_deltas = match bigrams.apply(self.bigrams.as_ref(), retry) {
                Ok(applied) => applied,
                Err(e) => {
                    // both tables move together or not at all
                    if let Err(revert) = unigrams.revert(self.unigrams.as_ref(), retry) {
                        log::error!("Unigram deltas left applied: {}", revert);
                    }
                    return Err(e.into());
                }
            };
        }

        self.unigrams.flush()?;
        self.bigrams.flush()?;
        self.checkpoints.save(&candidate)?;

        report.checkpoint = Some(candidate);
        Ok(report)
    }

    fn deltas(&self, kind: NgramKind, old: &str, new: &str) -> Result<DeltaSet, SyncError> {
        let aggregator = Aggregator::new(kind, self.config.aggregator.clone());
        let old = aggregator.aggregate_text(old)?;
        let new = aggregator.aggregate_text(new)?;
        Ok(DeltaSet::between(&old, &new))
    }
}
