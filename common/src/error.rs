use thiserror::Error;

/// Conditions that make the notifier skip an activity for the current tick.
///
/// None of these are fatal. Each is logged once and the activity is retried
/// at its next interval.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifierError {
    #[error("no network connection")]
    NoConnectivity,
    #[error("network is up but no cast device is available")]
    CastUnavailable,
    #[error("feed fetch failed, keeping previous feed: {0}")]
    FeedUnavailable(String),
    #[error("feed is either invalid or has no results: {0}")]
    FeedInvalid(String),
    #[error("wall clock is not synchronized yet")]
    TimeUnknown,
    #[error("event {id} starting at {start_time} has already been played")]
    DuplicateEvent { id: i64, start_time: i64 },
    #[error("no event starts within the tolerance window")]
    NoEventInWindow,
    #[error("cast device unreachable: {0}")]
    DeviceUnreachable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("cast target unreachable: {0}")]
    Unreachable(String),
    #[error("cast target rejected playback: {0}")]
    Rejected(String),
}

impl From<DeviceError> for NotifierError {
    fn from(err: DeviceError) -> Self {
        Self::DeviceUnreachable(err.to_string())
    }
}

impl From<FetchError> for NotifierError {
    fn from(err: FetchError) -> Self {
        Self::FeedUnavailable(err.to_string())
    }
}
