use tracing::warn;

use crate::{
    error::{FetchError, NotifierError},
    types::{Event, FeedDocument, OccupancyDocument},
};

/// Parses a feed body into its candidate events.
///
/// Entries that do not carry a usable `id` and `start_time` are skipped with a
/// warning. Malformed text, a feed without results and a feed with no usable
/// entry are reported the same way, so a transport sentinel like `"error"`
/// lands here too.
pub fn parse_feed(raw: &str) -> Result<Vec<Event>, NotifierError> {
    let document: FeedDocument = serde_json::from_str(raw.trim())
        .map_err(|err| NotifierError::FeedInvalid(err.to_string()))?;

    if document.results.is_empty() {
        return Err(NotifierError::FeedInvalid("empty results".to_string()));
    }

    let total = document.results.len();
    let events: Vec<Event> = document
        .results
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<Event>(entry) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!("skipping feed entry {index}: {err}");
                None
            }
        })
        .collect();

    if events.is_empty() {
        return Err(NotifierError::FeedInvalid(format!(
            "none of {total} entries is usable"
        )));
    }

    Ok(events)
}

/// Reads the `{ "status": bool }` occupancy document. `None` when unparseable.
pub fn parse_occupancy(raw: &str) -> Option<bool> {
    serde_json::from_str::<OccupancyDocument>(raw.trim())
        .ok()
        .map(|document| document.status)
}

/// Last successfully fetched feed text. A failed refresh never clears it.
#[derive(Debug, Clone, Default)]
pub struct FeedCache {
    text: Option<String>,
    refreshed_at_ms: Option<u64>,
    consecutive_failures: u32,
}

impl FeedCache {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn refreshed_at_ms(&self) -> Option<u64> {
        self.refreshed_at_ms
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn apply(
        &mut self,
        result: Result<String, FetchError>,
        now_ms: u64,
    ) -> Result<(), NotifierError> {
        match result {
            Ok(text) => {
                self.text = Some(text);
                self.refreshed_at_ms = Some(now_ms);
                self.consecutive_failures = 0;
                Ok(())
            }
            Err(err) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                Err(err.into())
            }
        }
    }

    pub fn events(&self) -> Result<Vec<Event>, NotifierError> {
        match self.text.as_deref() {
            Some(text) => parse_feed(text),
            None => Err(NotifierError::FeedInvalid("no feed fetched yet".to_string())),
        }
    }
}
