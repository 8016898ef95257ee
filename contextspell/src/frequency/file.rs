//! Plain text frequency file format.
//!
//! ```text
//! <distinct_key_count> <total_count_sum>
//! <key> <count>
//! <key> <count>
//! ...
//! ```
//!
//! Entries are sorted by descending count, ties by ascending key. Bigram keys
//! contain one interior space, so entries are split on the *last* space.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tempfile::NamedTempFile;

use super::{FrequencyError, FrequencyTable};
use crate::types::Count;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyHeader {
    pub distinct: u64,
    pub total: Count,
}

impl FrequencyHeader {
    fn parse(line: &str) -> Result<FrequencyHeader, FrequencyError> {
        let malformed = || FrequencyError::MalformedHeader(line.to_string());
        let mut parts = line.split_whitespace();

        let distinct = parts
            .next()
            .and_then(|x| x.parse().ok())
            .ok_or_else(malformed)?;
        let total = parts
            .next()
            .and_then(|x| x.parse().ok())
            .ok_or_else(malformed)?;

        if parts.next().is_some() {
            return Err(malformed());
        }

        Ok(FrequencyHeader { distinct, total })
    }

    /// Reads only the header line of a frequency file.
    pub fn from_path(path: &Path) -> Result<FrequencyHeader, FrequencyError> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut line = String::new();
        reader.read_line(&mut line)?;
        FrequencyHeader::parse(line.trim_end())
    }
}

/// Streaming reader over the entries following the header.
pub struct Entries<R> {
    reader: R,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> Entries<R> {
    /// Consumes the header line and returns it with an iterator over the entries.
    pub fn open(mut reader: R) -> Result<(FrequencyHeader, Entries<R>), FrequencyError> {
        let mut buf = String::new();
        reader.read_line(&mut buf)?;
        let header = FrequencyHeader::parse(buf.trim_end())?;
        buf.clear();

        Ok((
            header,
            Entries {
                reader,
                line_no: 1,
                buf,
            },
        ))
    }
}

impl<R: BufRead> Iterator for Entries<R> {
    type Item = Result<(SmolStr, Count), FrequencyError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_no += 1;

            let line = self.buf.trim_end_matches(&['\n', '\r'][..]);
            if line.is_empty() {
                continue;
            }

            return Some(parse_entry(line).ok_or_else(|| FrequencyError::MalformedEntry {
                line: self.line_no,
                content: line.to_string(),
            }));
        }
    }
}

fn parse_entry(line: &str) -> Option<(SmolStr, Count)> {
    let (key, count) = line.rsplit_once(' ')?;
    if key.is_empty() {
        return None;
    }
    let count = count.parse().ok()?;
    Some((SmolStr::new(key), count))
}

impl FrequencyTable {
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        let header = self.header();
        writeln!(writer, "{} {}", header.distinct, header.total)?;
        for (key, count) in self.sorted() {
            writeln!(writer, "{} {}", key, count)?;
        }
        writer.flush()
    }

    pub fn read_from<R: BufRead>(reader: R) -> Result<FrequencyTable, FrequencyError> {
        let (header, entries) = Entries::open(reader)?;
        let mut table = FrequencyTable::new();
        for entry in entries {
            let (key, count) = entry?;
            table.add(&key, count);
        }

        if table.header() != header {
            log::warn!(
                "frequency header says {} keys / {} total, found {} / {}",
                header.distinct,
                header.total,
                table.len(),
                table.total()
            );
        }

        Ok(table)
    }

    /// Writes the table next to `path` and atomically moves it into place.
    pub fn save(&self, path: &Path) -> Result<(), FrequencyError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let temp_file = NamedTempFile::new_in(dir)?;
        self.write_to(BufWriter::new(temp_file.as_file()))?;
        temp_file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<FrequencyTable, FrequencyError> {
        FrequencyTable::read_from(BufReader::new(File::open(path)?))
    }
}
