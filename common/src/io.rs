//! Narrow contracts with the board-level collaborators.
//!
//! Each runtime (host or ESP32) supplies its own implementations; the
//! scheduler only ever talks to these traits.

use crate::error::{DeviceError, FetchError};

pub trait TimeSource {
    /// Current Unix time in seconds, or 0 while not synchronized.
    fn unix_time(&mut self) -> i64;
}

pub trait FeedFetcher {
    fn fetch(&mut self, url: &str) -> Result<String, FetchError>;
}

pub trait DispatchGate {
    /// Whether the room is free for playback. Any failure counts as "not free".
    fn is_free(&mut self) -> bool;

    fn play(&mut self, message: &str) -> Result<(), DeviceError>;
}

pub trait ConnectivityProbe {
    fn is_network_connected(&mut self) -> bool;

    /// Expensive. Called at most once per reconnect edge.
    fn discover_device(&mut self, signal_id: &str, locale: &str) -> bool;
}

pub trait StatusIndicator {
    fn set_lit(&mut self, lit: bool);
}

/// Borrowed set of collaborators handed to the scheduler for one tick.
pub struct Collaborators<'a> {
    pub probe: &'a mut dyn ConnectivityProbe,
    pub clock: &'a mut dyn TimeSource,
    pub fetcher: &'a mut dyn FeedFetcher,
    pub gate: &'a mut dyn DispatchGate,
    pub indicator: &'a mut dyn StatusIndicator,
}
