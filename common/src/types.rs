use serde::{Deserialize, Deserializer, Serialize};

/// One candidate entry of the notice-board feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(deserialize_with = "whole_number")]
    pub id: i64,
    #[serde(deserialize_with = "whole_number")]
    pub start_time: i64,
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub kind: String,
    #[serde(rename = "intent_type", default, deserialize_with = "null_as_empty")]
    pub intent_kind: String,
    #[serde(rename = "msg", default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Entries stay raw so one malformed entry cannot hide the others.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FeedDocument {
    pub results: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct OccupancyDocument {
    pub status: bool,
}

/// Integer, or a finite float truncated toward zero.
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Number::deserialize(deserializer)? {
        number if number.is_i64() => number
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom("integer out of range")),
        number => number
            .as_f64()
            .filter(|value| value.is_finite() && value.abs() < i64::MAX as f64)
            .map(|value| value as i64)
            .ok_or_else(|| serde::de::Error::custom(format!("{number} is not a usable integer"))),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorMode {
    Searching,
    NoCast,
    Steady,
}

impl IndicatorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Searching => "SEARCHING",
            Self::NoCast => "NO_CAST",
            Self::Steady => "STEADY",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotificationView {
    pub id: i64,
    #[serde(rename = "startTime")]
    pub start_time: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "intentType")]
    pub intent_kind: String,
    pub msg: String,
    pub played: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotifierStatus {
    #[serde(rename = "networkReady")]
    pub network_ready: bool,
    #[serde(rename = "castReady")]
    pub cast_ready: bool,
    pub indicator: &'static str,
    #[serde(rename = "timeSynced")]
    pub time_synced: bool,
    #[serde(rename = "nowEpoch")]
    pub now_epoch: i64,
    #[serde(rename = "nowLocal")]
    pub now_local: Option<String>,
    #[serde(rename = "feedCached")]
    pub feed_cached: bool,
    #[serde(rename = "feedEvents")]
    pub feed_events: usize,
    pub notification: Option<NotificationView>,
    #[serde(rename = "playedCount")]
    pub played_count: u64,
    #[serde(rename = "lastIssue")]
    pub last_issue: Option<String>,
}
