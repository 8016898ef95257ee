//! Blocking client for the parts of the MediaWiki API the updater needs.
use std::time::Duration;

use hashbrown::HashMap;
use itertools::Itertools;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::checkpoint::{wiki_timestamp, Checkpoint};
use super::source::{ChangeFeed, RecentChange, Revision, RevisionSource};
use super::SyncError;
use crate::constants::RECENT_CHANGES_LIMIT;

const API_PATH: &str = "w/api.php";

pub struct MediaWiki {
    client: Client,
    api_url: String,
}

impl MediaWiki {
    /// Accepts either the wiki root (`https://it.wikipedia.org`) or the full
    /// API endpoint.
    pub fn new(base_url: &str, timeout: Duration) -> Result<MediaWiki, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("contextspell/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Fetch(format!("cannot build HTTP client: {}", e)))?;

        Ok(MediaWiki {
            client,
            api_url: api_url(base_url),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// The wiki root, with a trailing slash.
    pub fn site(&self) -> &str {
        self.api_url.trim_end_matches(API_PATH)
    }

    fn query<T: DeserializeOwned>(&self, params: &[(&str, String)]) -> Result<T, SyncError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(params)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| SyncError::Fetch(format!("{}: {}", self.api_url, e)))?;

        let body: serde_json::Value = response
            .json()
            .map_err(|e| SyncError::Fetch(format!("malformed response: {}", e)))?;
        parse_response(body)
    }
}

/// Normalizes a wiki URL to its `w/api.php` endpoint.
pub fn api_url(base_url: &str) -> String {
    if base_url.ends_with(API_PATH) {
        return base_url.to_string();
    }
    let mut url = base_url.to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str(API_PATH);
    url
}

fn parse_response<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, SyncError> {
    if let Some(error) = body.get("error") {
        return Err(SyncError::Fetch(format!("API error: {}", error)));
    }
    serde_json::from_value(body).map_err(|e| SyncError::Fetch(format!("malformed response: {}", e)))
}

#[derive(Deserialize)]
struct RecentChangesResponse {
    query: RecentChangesQuery,
}

#[derive(Deserialize)]
struct RecentChangesQuery {
    recentchanges: Vec<RecentChange>,
}

#[derive(Deserialize)]
struct RevisionsResponse {
    #[serde(default)]
    query: Option<RevisionsQuery>,
}

#[derive(Deserialize)]
struct RevisionsQuery {
    #[serde(default)]
    pages: HashMap<String, PageEntry>,
}

#[derive(Deserialize)]
struct PageEntry {
    pageid: Option<u64>,
    title: Option<String>,
    #[serde(default)]
    revisions: Vec<RevisionEntry>,
}

#[derive(Deserialize)]
struct RevisionEntry {
    revid: Option<u64>,
    #[serde(rename = "*")]
    content: Option<String>,
}

fn recent_changes_after(response: RecentChangesResponse, last_id: u64) -> Vec<RecentChange> {
    response
        .query
        .recentchanges
        .into_iter()
        .filter(|rc| rc.rcid > last_id)
        .collect()
}

fn revisions_of(response: RevisionsResponse) -> Vec<Revision> {
    let pages = match response.query {
        Some(query) => query.pages,
        None => return Vec::new(),
    };

    let mut revisions = pages
        .into_iter()
        .flat_map(|(_, page)| {
            let page_id = page.pageid;
            let title = page.title;
            page.revisions.into_iter().filter_map(move |rev| {
                Some(Revision {
                    revid: rev.revid?,
                    page_id: page_id?,
                    title: title.clone()?,
                    content: rev.content?,
                })
            })
        })
        .collect::<Vec<_>>();
    revisions.sort_by_key(|r| r.revid);
    revisions
}

impl ChangeFeed for MediaWiki {
    fn recent_changes(
        &self,
        since: &Checkpoint,
        namespace: i64,
    ) -> Result<Vec<RecentChange>, SyncError> {
        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("list", "recentchanges".to_string()),
            ("continue", String::new()),
            ("rcnamespace", namespace.to_string()),
            (
                "rcstart",
                since.start_from.format(wiki_timestamp::FORMAT).to_string(),
            ),
            ("rcdir", "newer".to_string()),
            ("rclimit", RECENT_CHANGES_LIMIT.to_string()),
            ("rcprop", "ids|timestamp".to_string()),
        ];
        let response: RecentChangesResponse = self.query(&params)?;
        let changes = recent_changes_after(response, since.last_id);
        log::debug!("{} recent changes after id {}", changes.len(), since.last_id);
        Ok(changes)
    }
}

impl RevisionSource for MediaWiki {
    fn revisions(&self, ids: &[u64]) -> Result<Vec<Revision>, SyncError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("prop", "revisions".to_string()),
            ("rvprop", "ids|content".to_string()),
            ("revids", ids.iter().join("|")),
        ];
        let response: RevisionsResponse = self.query(&params)?;
        Ok(revisions_of(response))
    }
}
