//! The outside world the updater reads from.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::checkpoint::Checkpoint;
use super::extractor::MarkupDocument;
use super::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Edit,
    New,
    Log,
    External,
    Categorize,
    #[serde(other)]
    Other,
}

/// One entry of the recent changes feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentChange {
    pub rcid: u64,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub revid: u64,
    /// Zero for page creations.
    #[serde(default)]
    pub old_revid: u64,
    pub timestamp: DateTime<Utc>,
}

/// Raw markup of a page at one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub revid: u64,
    pub page_id: u64,
    pub title: String,
    pub content: String,
}

/// Both sides of an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionPair {
    pub old: Revision,
    pub new: Revision,
}

pub trait ChangeFeed {
    /// Changes newer than `since`, oldest first: id greater than
    /// `since.last_id`, timestamp not before `since.start_from`.
    fn recent_changes(
        &self,
        since: &Checkpoint,
        namespace: i64,
    ) -> Result<Vec<RecentChange>, SyncError>;
}

pub trait RevisionSource {
    /// Fetches revisions by id. Deleted or unknown revisions are left out of
    /// the result rather than reported.
    fn revisions(&self, ids: &[u64]) -> Result<Vec<Revision>, SyncError>;

    /// Both revisions of an edit, or `None` if either one is gone.
    fn revision_pair(&self, change: &RecentChange) -> Result<Option<RevisionPair>, SyncError> {
        let mut revisions = self.revisions(&[change.old_revid, change.revid])?;
        let mut take = |id: u64| {
            revisions
                .iter()
                .position(|r| r.revid == id)
                .map(|idx| revisions.swap_remove(idx))
        };

        match (take(change.old_revid), take(change.revid)) {
            (Some(old), Some(new)) => Ok(Some(RevisionPair { old, new })),
            _ => Ok(None),
        }
    }
}

/// Turns wiki markup into plain text, one output for a whole document.
pub trait TextExtractor {
    fn extract(&self, document: &MarkupDocument) -> Result<String, SyncError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feed_entries() {
        let change: RecentChange = serde_json::from_str(
            r#"{"type": "edit", "ns": 0, "rcid": 81, "pageid": 3, "revid": 12,
                "old_revid": 11, "timestamp": "2015-03-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(change.kind, ChangeKind::Edit);
        assert_eq!(change.rcid, 81);
        assert_eq!(change.old_revid, 11);
        assert_eq!(change.timestamp.timestamp(), 1_425_211_200);

        let log: RecentChange = serde_json::from_str(
            r#"{"type": "something-new", "rcid": 82, "timestamp": "2015-03-01T12:00:01Z"}"#,
        )
        .unwrap();
        assert_eq!(log.kind, ChangeKind::Other);
        assert_eq!(log.revid, 0);
    }
}
