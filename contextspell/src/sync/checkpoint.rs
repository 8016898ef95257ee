//! Persisted sync progress.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::source::RecentChange;
use super::SyncError;

/// Where the updater writes its counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreLocation {
    pub unigrams: String,
    pub bigrams: String,
}

/// The last change absorbed into the store.
///
/// Changes with an id greater than `last_id` and a timestamp not older than
/// `start_from` are still to be processed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_id: u64,
    #[serde(with = "wiki_timestamp")]
    pub start_from: DateTime<Utc>,
    #[serde(default)]
    pub store: StoreLocation,
}

impl Checkpoint {
    /// Nothing processed yet.
    pub fn initial() -> Checkpoint {
        Checkpoint {
            last_id: 0,
            start_from: DateTime::<Utc>::from(UNIX_EPOCH),
            store: StoreLocation::default(),
        }
    }

    /// Moves past `change`. Never moves backwards.
    pub fn advance(&mut self, change: &RecentChange) {
        self.last_id = self.last_id.max(change.rcid);
        self.start_from = self.start_from.max(change.timestamp);
    }
}

impl Default for Checkpoint {
    fn default() -> Checkpoint {
        Checkpoint::initial()
    }
}

/// Timestamps in the `YYYYMMDDHHMMSS` form the change feed expects.
pub(crate) mod wiki_timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y%m%d%H%M%S";

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|e| de::Error::custom(format!("bad timestamp {:?}: {}", raw, e)))
    }
}

/// A checkpoint stored as JSON at a fixed path.
#[derive(Clone, Debug)]
pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    pub fn new(path: impl Into<PathBuf>) -> CheckpointFile {
        CheckpointFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the checkpoint. A missing file means starting from scratch; a
    /// file that cannot be parsed is an error.
    pub fn load(&self) -> Result<Checkpoint, SyncError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "No checkpoint at {}, starting from the beginning",
                    self.path.display()
                );
                return Ok(Checkpoint::initial());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_reader(BufReader::new(file)).map_err(|e| SyncError::Checkpoint {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Replaces the checkpoint atomically.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), SyncError> {
        let failed = |reason: String| SyncError::Checkpoint {
            path: self.path.clone(),
            reason,
        };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let temp_file = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp_file.as_file());
            serde_json::to_writer_pretty(&mut writer, checkpoint)
                .map_err(|e| failed(e.to_string()))?;
            writer.flush()?;
        }
        temp_file
            .persist(&self.path)
            .map_err(|e| failed(e.error.to_string()))?;

        log::info!(
            "Checkpoint saved: last id {}, start from {}",
            checkpoint.last_id,
            checkpoint.start_from.format(wiki_timestamp::FORMAT)
        );
        Ok(())
    }
}
