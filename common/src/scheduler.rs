use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    config::{IntervalConfig, NotifierConfig, RuntimeConfig},
    connectivity::{ConnectivityGate, ConnectivityState, IndicatorDriver, Transition},
    error::NotifierError,
    feed::FeedCache,
    io::{Collaborators, DispatchGate},
    notification::{Notification, NotificationState, UpdateOutcome},
    selector::select_due,
    types::NotifierStatus,
};

/// Last-fired bookkeeping for one periodic activity, on the monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityTimer {
    last_fired_ms: Option<u64>,
}

impl ActivityTimer {
    pub fn is_due(&self, now_ms: u64, interval_ms: u64) -> bool {
        self.last_fired_ms
            .map(|last| now_ms.saturating_sub(last) >= interval_ms)
            .unwrap_or(true)
    }

    pub fn fire(&mut self, now_ms: u64) {
        self.last_fired_ms = Some(now_ms);
    }

    pub fn last_fired_ms(&self) -> Option<u64> {
        self.last_fired_ms
    }
}

/// Wall clock extrapolated from the last successful sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock {
    synced: Option<(i64, u64)>,
}

impl WallClock {
    pub fn is_synced(&self) -> bool {
        self.synced.is_some()
    }

    pub fn sync(&mut self, unix: i64, now_ms: u64) {
        self.synced = Some((unix, now_ms));
    }

    /// Unix seconds at `now_ms`, or 0 when never synchronized.
    pub fn now(&self, now_ms: u64) -> i64 {
        match self.synced {
            Some((unix, at_ms)) => {
                let elapsed_secs = now_ms.saturating_sub(at_ms) / 1_000;
                unix.saturating_add(i64::try_from(elapsed_secs).unwrap_or(i64::MAX))
            }
            None => 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub connectivity: ConnectivityState,
    pub time_synced: bool,
    pub feed_refreshed: bool,
    pub dispatch_ran: bool,
    /// Id of the event played during this tick.
    pub dispatched: Option<i64>,
    pub issues: Vec<NotifierError>,
}

/// Top-level controller. Owns all notifier state and advances it one
/// cooperative tick at a time.
#[derive(Debug, Clone)]
pub struct Notifier {
    config: NotifierConfig,
    intervals: IntervalConfig,
    connected_sound_url: Option<String>,
    feed_url: String,

    gate: ConnectivityGate,
    indicator: IndicatorDriver,
    clock: WallClock,
    feed: FeedCache,
    feed_events: usize,
    notification: NotificationState,

    connectivity_timer: ActivityTimer,
    time_timer: ActivityTimer,
    feed_timer: ActivityTimer,
    dispatch_timer: ActivityTimer,
    dispatch_deadline_ms: Option<u64>,

    played_count: u64,
    last_issue: Option<NotifierError>,
}

impl Notifier {
    pub fn new(mut runtime: RuntimeConfig) -> Self {
        runtime.sanitize();
        let feed_url = runtime.notifier.feed_url();
        Self {
            config: runtime.notifier,
            intervals: runtime.intervals,
            connected_sound_url: runtime.cast.connected_sound_url,
            feed_url,
            gate: ConnectivityGate::new(),
            indicator: IndicatorDriver::default(),
            clock: WallClock::default(),
            feed: FeedCache::default(),
            feed_events: 0,
            notification: NotificationState::new(),
            connectivity_timer: ActivityTimer::default(),
            time_timer: ActivityTimer::default(),
            feed_timer: ActivityTimer::default(),
            dispatch_timer: ActivityTimer::default(),
            dispatch_deadline_ms: None,
            played_count: 0,
            last_issue: None,
        }
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.gate.state()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.current()
    }

    pub fn feed(&self) -> &FeedCache {
        &self.feed
    }

    pub fn unix_now(&self, now_ms: u64) -> i64 {
        self.clock.now(now_ms)
    }

    pub fn played_count(&self) -> u64 {
        self.played_count
    }

    pub fn dispatch_deadline_ms(&self) -> Option<u64> {
        self.dispatch_deadline_ms
    }

    pub fn tick(&mut self, now_ms: u64, io: &mut Collaborators<'_>) -> TickReport {
        let mut report = TickReport::default();

        if self.connectivity_timer.is_due(now_ms, self.intervals.indicator_ms) {
            self.connectivity_timer.fire(now_ms);
            let transition =
                self.gate
                    .probe(io.probe, &self.config.signal_id, &self.config.locale);
            if matches!(transition, Transition::Restored { discovered: Some(true) }) {
                self.announce_connected(io.gate);
            }
            self.indicator
                .refresh(io.indicator, self.gate.state().indicator_mode(), now_ms);
        }

        let state = self.gate.state();
        report.connectivity = state;
        if !state.network_ready {
            self.record(&mut report, NotifierError::NoConnectivity);
            return report;
        }

        self.sync_time_if_due(now_ms, io, &mut report);
        self.refresh_feed_if_due(now_ms, io, &mut report);

        if self.dispatch_due(now_ms) {
            self.dispatch_timer.fire(now_ms);
            self.dispatch_deadline_ms = None;
            report.dispatch_ran = true;
            self.run_dispatch(now_ms, io.gate, &mut report);
        }

        report
    }

    pub fn status(&self, now_ms: u64) -> NotifierStatus {
        let state = self.gate.state();
        NotifierStatus {
            network_ready: state.network_ready,
            cast_ready: state.cast_ready,
            indicator: state.indicator_mode().as_str(),
            time_synced: self.clock.is_synced(),
            now_epoch: self.clock.now(now_ms),
            now_local: None,
            feed_cached: !self.feed.is_empty(),
            feed_events: self.feed_events,
            notification: self.notification.current().map(Notification::view),
            played_count: self.played_count,
            last_issue: self.last_issue.as_ref().map(ToString::to_string),
        }
    }

    fn sync_time_if_due(&mut self, now_ms: u64, io: &mut Collaborators<'_>, report: &mut TickReport) {
        let interval = if self.clock.is_synced() {
            self.intervals.time_sync_ms
        } else {
            self.intervals.retry_ms
        };
        if !self.time_timer.is_due(now_ms, interval) {
            return;
        }
        self.time_timer.fire(now_ms);

        let unix = io.clock.unix_time();
        if unix > 0 {
            if !self.clock.is_synced() {
                info!("wall clock synchronized at {}", format_epoch(unix));
            }
            self.clock.sync(unix, now_ms);
            report.time_synced = true;
        } else if self.clock.is_synced() {
            warn!("time sync returned 0; extrapolating from previous sync");
        } else {
            self.record(report, NotifierError::TimeUnknown);
        }
    }

    fn refresh_feed_if_due(
        &mut self,
        now_ms: u64,
        io: &mut Collaborators<'_>,
        report: &mut TickReport,
    ) {
        let interval = if self.feed.is_empty() {
            self.intervals.retry_ms
        } else {
            self.intervals.feed_refresh_ms
        };
        if !self.feed_timer.is_due(now_ms, interval) {
            return;
        }
        self.feed_timer.fire(now_ms);

        let result = io.fetcher.fetch(&self.feed_url);
        match self.feed.apply(result, now_ms) {
            Ok(()) => {
                debug!("feed refreshed from {}", self.feed_url);
                report.feed_refreshed = true;
            }
            Err(issue) => self.record(report, issue),
        }
    }

    fn dispatch_due(&self, now_ms: u64) -> bool {
        self.dispatch_timer.is_due(now_ms, self.intervals.dispatch_ms)
            || self
                .dispatch_deadline_ms
                .map(|deadline| now_ms >= deadline)
                .unwrap_or(false)
    }

    fn run_dispatch(&mut self, now_ms: u64, gate: &mut dyn DispatchGate, report: &mut TickReport) {
        let now = self.clock.now(now_ms);
        if now == 0 {
            self.record(report, NotifierError::TimeUnknown);
            return;
        }

        if !self.gate.state().cast_ready {
            self.record(report, NotifierError::CastUnavailable);
            return;
        }

        let events = match self.feed.events() {
            Ok(events) => events,
            Err(issue) => {
                self.feed_events = 0;
                self.record(report, issue);
                return;
            }
        };
        self.feed_events = events.len();

        let Some(selected) = select_due(&events, now, self.config.tolerance_secs).cloned() else {
            self.record(report, NotifierError::NoEventInWindow);
            return;
        };

        let (id, start_time) = (selected.id, selected.start_time);
        match self.notification.update(selected) {
            UpdateOutcome::Unchanged => {
                self.record(report, NotifierError::DuplicateEvent { id, start_time });
                return;
            }
            UpdateOutcome::Replaced => {
                info!(
                    "next notification: event {id} at {}",
                    format_epoch(start_time)
                );
            }
            UpdateOutcome::StillPending => {
                debug!("event {id} still pending");
            }
        }

        let delay_secs = start_time.saturating_sub(now).max(0);
        if delay_secs > 0 {
            let delay_ms = u64::try_from(delay_secs).unwrap_or(u64::MAX).saturating_mul(1_000);
            self.dispatch_deadline_ms = Some(now_ms.saturating_add(delay_ms));
            info!("event {id} due in {delay_secs}s");
            return;
        }

        if !gate.is_free() {
            info!("room is not free; deferring event {id}");
            return;
        }
        info!("room is free");

        let message = self
            .notification
            .pending()
            .map(|pending| pending.message.clone())
            .unwrap_or_default();

        match gate.play(&message) {
            Ok(()) => {
                self.notification.mark_played();
                self.played_count = self.played_count.saturating_add(1);
                report.dispatched = Some(id);
                info!("event {id} played");
            }
            Err(err) => self.record(report, err.into()),
        }
    }

    fn announce_connected(&mut self, gate: &mut dyn DispatchGate) {
        let Some(url) = self.connected_sound_url.as_deref() else {
            return;
        };
        if let Err(err) = gate.play(url) {
            warn!("connected chime failed: {err}");
        }
    }

    fn record(&mut self, report: &mut TickReport, issue: NotifierError) {
        match &issue {
            NotifierError::NoConnectivity | NotifierError::CastUnavailable => debug!("{issue}"),
            NotifierError::DuplicateEvent { .. } | NotifierError::NoEventInWindow => {
                info!("{issue}")
            }
            _ => warn!("{issue}"),
        }
        self.last_issue = Some(issue.clone());
        report.issues.push(issue);
    }
}

fn format_epoch(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        error::{DeviceError, FetchError},
        io::{ConnectivityProbe, FeedFetcher, StatusIndicator, TimeSource},
        types::IndicatorMode,
    };

    const T: i64 = 1_700_000_000;
    const CHIME: &str = "https://sounds.example.com/connected.ogg";

    struct FakeProbe {
        connected: bool,
        discover_result: bool,
        discover_calls: u32,
    }

    impl ConnectivityProbe for FakeProbe {
        fn is_network_connected(&mut self) -> bool {
            self.connected
        }

        fn discover_device(&mut self, _signal_id: &str, _locale: &str) -> bool {
            self.discover_calls += 1;
            self.discover_result
        }
    }

    /// Reports `epoch_at_zero + now_ms / 1000`, or 0 when `epoch_at_zero` is 0.
    struct FakeClock {
        epoch_at_zero: i64,
        now_ms: u64,
        calls: u32,
    }

    impl TimeSource for FakeClock {
        fn unix_time(&mut self) -> i64 {
            self.calls += 1;
            if self.epoch_at_zero == 0 {
                return 0;
            }
            self.epoch_at_zero + (self.now_ms / 1_000) as i64
        }
    }

    struct FakeFetcher {
        response: Result<String, FetchError>,
        urls: Vec<String>,
    }

    impl FeedFetcher for FakeFetcher {
        fn fetch(&mut self, url: &str) -> Result<String, FetchError> {
            self.urls.push(url.to_string());
            self.response.clone()
        }
    }

    struct FakeGate {
        free: bool,
        free_checks: u32,
        play_results: VecDeque<Result<(), DeviceError>>,
        played: Vec<String>,
    }

    impl DispatchGate for FakeGate {
        fn is_free(&mut self) -> bool {
            self.free_checks += 1;
            self.free
        }

        fn play(&mut self, message: &str) -> Result<(), DeviceError> {
            let result = self.play_results.pop_front().unwrap_or(Ok(()));
            if result.is_ok() {
                self.played.push(message.to_string());
            }
            result
        }
    }

    #[derive(Default)]
    struct FakeLed {
        writes: Vec<bool>,
    }

    impl StatusIndicator for FakeLed {
        fn set_lit(&mut self, lit: bool) {
            self.writes.push(lit);
        }
    }

    struct Rig {
        probe: FakeProbe,
        clock: FakeClock,
        fetcher: FakeFetcher,
        gate: FakeGate,
        led: FakeLed,
    }

    impl Rig {
        fn new(feed: &str) -> Self {
            Self {
                probe: FakeProbe {
                    connected: true,
                    discover_result: true,
                    discover_calls: 0,
                },
                clock: FakeClock {
                    epoch_at_zero: T,
                    now_ms: 0,
                    calls: 0,
                },
                fetcher: FakeFetcher {
                    response: Ok(feed.to_string()),
                    urls: Vec::new(),
                },
                gate: FakeGate {
                    free: true,
                    free_checks: 0,
                    play_results: VecDeque::new(),
                    played: Vec::new(),
                },
                led: FakeLed::default(),
            }
        }

        fn tick(&mut self, notifier: &mut Notifier, now_ms: u64) -> TickReport {
            self.clock.now_ms = now_ms;
            let mut io = Collaborators {
                probe: &mut self.probe,
                clock: &mut self.clock,
                fetcher: &mut self.fetcher,
                gate: &mut self.gate,
                indicator: &mut self.led,
            };
            notifier.tick(now_ms, &mut io)
        }
    }

    fn feed(events: &[(i64, i64)]) -> String {
        let results: Vec<serde_json::Value> = events
            .iter()
            .map(|(id, start_time)| {
                serde_json::json!({
                    "id": id,
                    "type": "invite",
                    "intent_type": "audio",
                    "start_time": start_time,
                    "msg": format!("https://cdn.example.com/{id}.mp3"),
                })
            })
            .collect();
        serde_json::json!({ "results": results }).to_string()
    }

    fn notifier() -> Notifier {
        let mut runtime = RuntimeConfig::default();
        runtime.cast.connected_sound_url = None;
        Notifier::new(runtime)
    }

    #[test]
    fn activity_timer_is_due_until_fired() {
        let mut timer = ActivityTimer::default();
        assert!(timer.is_due(0, 1_000));

        timer.fire(500);
        assert!(!timer.is_due(1_499, 1_000));
        assert!(timer.is_due(1_500, 1_000));
        assert_eq!(timer.last_fired_ms(), Some(500));
    }

    #[test]
    fn wall_clock_extrapolates_from_last_sync() {
        let mut clock = WallClock::default();
        assert_eq!(clock.now(5_000), 0);

        clock.sync(T, 2_000);
        assert_eq!(clock.now(2_000), T);
        assert_eq!(clock.now(64_999), T + 62);
    }

    #[test]
    fn due_event_plays_once_then_is_duplicate() {
        let mut rig = Rig::new(&feed(&[(1, T)]));
        let mut notifier = notifier();

        let first = rig.tick(&mut notifier, 0);
        assert!(first.time_synced);
        assert!(first.feed_refreshed);
        assert_eq!(first.dispatched, Some(1));
        assert_eq!(rig.gate.played, vec!["https://cdn.example.com/1.mp3".to_string()]);
        assert_eq!(notifier.notification().map(|n| n.played), Some(true));

        let quiet = rig.tick(&mut notifier, 1_000);
        assert!(!quiet.dispatch_ran);

        let repeat = rig.tick(&mut notifier, 120_000);
        assert!(repeat.dispatch_ran);
        assert_eq!(repeat.dispatched, None);
        assert_eq!(
            repeat.issues,
            vec![NotifierError::DuplicateEvent { id: 1, start_time: T }]
        );
        assert_eq!(rig.gate.played.len(), 1);
        assert_eq!(notifier.played_count(), 1);
    }

    #[test]
    fn events_outside_window_are_not_dispatched() {
        let mut rig = Rig::new(&feed(&[(1, T - 1_000), (2, T + 1_000)]));
        let mut notifier = notifier();

        let report = rig.tick(&mut notifier, 0);

        assert_eq!(report.issues, vec![NotifierError::NoEventInWindow]);
        assert!(rig.gate.played.is_empty());
        assert!(notifier.notification().is_none());
    }

    #[test]
    fn failed_refetch_keeps_cached_feed_and_played_flag() {
        let mut rig = Rig::new(&feed(&[(1, T)]));
        let mut notifier = notifier();
        rig.tick(&mut notifier, 0);
        let before = notifier.notification().cloned();

        rig.fetcher.response = Err(FetchError::Transport("connection reset".to_string()));
        let report = rig.tick(&mut notifier, 300_000);

        assert!(report
            .issues
            .iter()
            .any(|issue| matches!(issue, NotifierError::FeedUnavailable(_))));
        assert!(report.issues.contains(&NotifierError::DuplicateEvent { id: 1, start_time: T }));
        assert_eq!(notifier.notification().cloned(), before);
        assert!(notifier.feed().text().is_some());
        assert_eq!(rig.gate.played.len(), 1);
    }

    #[test]
    fn failed_refetch_still_lets_pending_event_play() {
        let mut rig = Rig::new(&feed(&[(1, T + 200)]));
        let mut runtime = RuntimeConfig::default();
        runtime.cast.connected_sound_url = None;
        runtime.intervals.feed_refresh_ms = 100_000;
        let mut notifier = Notifier::new(runtime);
        rig.tick(&mut notifier, 0);
        assert_eq!(notifier.notification().map(|n| n.played), Some(false));
        assert_eq!(notifier.dispatch_deadline_ms(), Some(200_000));

        rig.fetcher.response = Err(FetchError::Status(500));
        rig.tick(&mut notifier, 100_000);
        let report = rig.tick(&mut notifier, 200_000);

        assert!(report
            .issues
            .iter()
            .any(|issue| matches!(issue, NotifierError::FeedUnavailable(_))));
        assert_eq!(report.dispatched, Some(1));
        assert_eq!(notifier.notification().map(|n| n.played), Some(true));
        assert_eq!(notifier.feed().consecutive_failures(), 2);
    }

    #[test]
    fn failed_discovery_blocks_dispatch_until_next_edge() {
        let mut rig = Rig::new(&feed(&[(1, T)]));
        rig.probe.discover_result = false;
        let mut notifier = notifier();

        let report = rig.tick(&mut notifier, 0);
        assert!(report.connectivity.network_ready);
        assert!(!report.connectivity.cast_ready);
        assert_eq!(report.issues, vec![NotifierError::CastUnavailable]);

        rig.tick(&mut notifier, 120_000);
        assert_eq!(rig.probe.discover_calls, 1);
        assert_eq!(rig.gate.free_checks, 0);
        assert!(rig.gate.played.is_empty());

        rig.probe.connected = false;
        rig.tick(&mut notifier, 120_200);
        rig.probe.connected = true;
        rig.probe.discover_result = true;
        let report = rig.tick(&mut notifier, 240_200);

        assert_eq!(rig.probe.discover_calls, 2);
        assert_eq!(report.dispatched, Some(1));
    }

    #[test]
    fn never_dispatches_without_wall_clock() {
        let mut rig = Rig::new(&feed(&[(1, T)]));
        rig.clock.epoch_at_zero = 0;
        let mut notifier = notifier();

        let report = rig.tick(&mut notifier, 0);
        assert!(report.issues.contains(&NotifierError::TimeUnknown));

        rig.tick(&mut notifier, 200);
        assert_eq!(rig.clock.calls, 1);
        rig.tick(&mut notifier, 5_000);
        assert_eq!(rig.clock.calls, 2);
        assert_eq!(rig.gate.free_checks, 0);
        assert!(rig.gate.played.is_empty());

        rig.clock.epoch_at_zero = T - 10;
        rig.tick(&mut notifier, 10_000);
        assert_eq!(notifier.unix_now(10_000), T);
        let report = rig.tick(&mut notifier, 120_000);
        assert_eq!(report.dispatched, Some(1));
    }

    #[test]
    fn upcoming_event_fires_at_its_start_time() {
        let mut rig = Rig::new(&feed(&[(4, T + 100)]));
        let mut notifier = notifier();

        let first = rig.tick(&mut notifier, 0);
        assert_eq!(first.dispatched, None);
        assert_eq!(notifier.dispatch_deadline_ms(), Some(100_000));
        assert_eq!(rig.gate.free_checks, 0);

        let early = rig.tick(&mut notifier, 99_000);
        assert!(!early.dispatch_ran);

        let on_time = rig.tick(&mut notifier, 100_000);
        assert!(on_time.dispatch_ran);
        assert_eq!(on_time.dispatched, Some(4));
        assert_eq!(notifier.dispatch_deadline_ms(), None);
    }

    #[test]
    fn occupied_room_defers_to_next_interval() {
        let mut rig = Rig::new(&feed(&[(1, T)]));
        rig.gate.free = false;
        let mut notifier = notifier();

        rig.tick(&mut notifier, 0);
        assert_eq!(rig.gate.free_checks, 1);

        for now_ms in (200..120_000).step_by(200) {
            rig.tick(&mut notifier, now_ms);
        }
        assert_eq!(rig.gate.free_checks, 1);

        rig.gate.free = true;
        let report = rig.tick(&mut notifier, 120_000);
        assert_eq!(report.dispatched, Some(1));
        assert_eq!(rig.gate.free_checks, 2);
    }

    #[test]
    fn playback_failure_keeps_event_pending() {
        let mut rig = Rig::new(&feed(&[(1, T)]));
        rig.gate
            .play_results
            .push_back(Err(DeviceError::Unreachable("no route".to_string())));
        let mut notifier = notifier();

        let report = rig.tick(&mut notifier, 0);
        assert!(matches!(
            report.issues.as_slice(),
            [NotifierError::DeviceUnreachable(_)]
        ));
        assert_eq!(notifier.notification().map(|n| n.played), Some(false));

        let retry = rig.tick(&mut notifier, 120_000);
        assert_eq!(retry.dispatched, Some(1));
        assert_eq!(notifier.notification().map(|n| n.played), Some(true));
    }

    #[test]
    fn offline_tick_only_probes_and_blinks() {
        let mut rig = Rig::new(&feed(&[(1, T)]));
        rig.probe.connected = false;
        let mut notifier = notifier();

        let report = rig.tick(&mut notifier, 0);

        assert_eq!(report.issues, vec![NotifierError::NoConnectivity]);
        assert_eq!(rig.clock.calls, 0);
        assert!(rig.fetcher.urls.is_empty());
        assert_eq!(rig.led.writes, vec![true]);
        assert_eq!(notifier.status(0).indicator, IndicatorMode::Searching.as_str());

        rig.tick(&mut notifier, 1_000);
        assert_eq!(rig.led.writes, vec![true, false]);
    }

    #[test]
    fn new_event_replaces_played_one() {
        let mut rig = Rig::new(&feed(&[(1, T)]));
        let mut notifier = notifier();
        rig.tick(&mut notifier, 0);

        rig.fetcher.response = Ok(feed(&[(2, T + 300)]));
        rig.tick(&mut notifier, 300_000);
        assert_eq!(notifier.notification().map(|n| n.id), Some(2));
        assert_eq!(notifier.notification().map(|n| n.played), Some(true));
        assert_eq!(rig.gate.played.len(), 2);
    }

    #[test]
    fn discovery_plays_connected_chime() {
        let mut rig = Rig::new(&feed(&[(1, T + 3_000)]));
        let mut runtime = RuntimeConfig::default();
        runtime.cast.connected_sound_url = Some(CHIME.to_string());
        let mut notifier = Notifier::new(runtime);

        rig.tick(&mut notifier, 0);

        assert_eq!(rig.gate.played, vec![CHIME.to_string()]);
        assert_eq!(notifier.played_count(), 0);
    }

    #[test]
    fn status_reflects_current_notification() {
        let mut rig = Rig::new(&feed(&[(9, T)]));
        let mut notifier = notifier();
        rig.tick(&mut notifier, 0);

        let status = notifier.status(2_000);

        assert!(status.network_ready && status.cast_ready && status.time_synced);
        assert_eq!(status.now_epoch, T + 2);
        assert_eq!(status.feed_events, 1);
        assert_eq!(status.played_count, 1);
        let view = status.notification.unwrap();
        assert_eq!((view.id, view.played), (9, true));
        assert_eq!(rig.fetcher.urls, vec![notifier.config().feed_url()]);
    }
}
