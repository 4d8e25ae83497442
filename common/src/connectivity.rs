use tracing::{info, warn};

use crate::{
    io::{ConnectivityProbe, StatusIndicator},
    types::IndicatorMode,
};

pub const LED_FAST_BLINK_MS: u64 = 200;
pub const LED_SLOW_BLINK_MS: u64 = 900;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectivityState {
    pub network_ready: bool,
    pub cast_ready: bool,
}

impl ConnectivityState {
    pub fn indicator_mode(self) -> IndicatorMode {
        match (self.network_ready, self.cast_ready) {
            (false, _) => IndicatorMode::Searching,
            (true, false) => IndicatorMode::NoCast,
            (true, true) => IndicatorMode::Steady,
        }
    }

    pub fn can_dispatch(self) -> bool {
        self.network_ready && self.cast_ready
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Lost,
    /// Rising edge. `discovered` is `None` when the cast device was already
    /// known and no discovery was attempted.
    Restored { discovered: Option<bool> },
}

#[derive(Debug, Clone, Default)]
pub struct ConnectivityGate {
    state: ConnectivityState,
    discovery_attempts: u64,
}

impl ConnectivityGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn discovery_attempts(&self) -> u64 {
        self.discovery_attempts
    }

    pub fn probe(
        &mut self,
        probe: &mut dyn ConnectivityProbe,
        signal_id: &str,
        locale: &str,
    ) -> Transition {
        let connected = probe.is_network_connected();
        let was_connected = self.state.network_ready;
        self.state.network_ready = connected;

        match (was_connected, connected) {
            (true, false) => {
                warn!("network connection lost; polling suspended");
                Transition::Lost
            }
            (false, true) => {
                info!("network connection established");
                if self.state.cast_ready {
                    return Transition::Restored { discovered: None };
                }

                self.discovery_attempts = self.discovery_attempts.saturating_add(1);
                let found = probe.discover_device(signal_id, locale);
                if found {
                    info!("cast device `{signal_id}` discovered (locale {locale})");
                    self.state.cast_ready = true;
                } else {
                    warn!(
                        "cast device `{signal_id}` not found; will retry on next reconnect"
                    );
                }
                Transition::Restored {
                    discovered: Some(found),
                }
            }
            _ => Transition::Unchanged,
        }
    }
}

pub fn indicator_lit(mode: IndicatorMode, now_ms: u64) -> bool {
    match mode {
        IndicatorMode::Searching => ((now_ms / LED_SLOW_BLINK_MS) % 2) == 0,
        IndicatorMode::NoCast => ((now_ms / LED_FAST_BLINK_MS) % 2) == 0,
        IndicatorMode::Steady => true,
    }
}

/// Only touches the indicator when the desired level changes.
#[derive(Debug, Clone, Default)]
pub struct IndicatorDriver {
    lit: Option<bool>,
}

impl IndicatorDriver {
    pub fn refresh(
        &mut self,
        indicator: &mut dyn StatusIndicator,
        mode: IndicatorMode,
        now_ms: u64,
    ) {
        let desired = indicator_lit(mode, now_ms);
        if self.lit == Some(desired) {
            return;
        }
        indicator.set_lit(desired);
        self.lit = Some(desired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[derive(Default)]
    struct RecordingLed {
        writes: Vec<bool>,
    }

    impl StatusIndicator for RecordingLed {
        fn set_lit(&mut self, lit: bool) {
            self.writes.push(lit);
        }
    }

    #[test]
    fn discovery_runs_once_per_rising_edge() {
        let mut gate = ConnectivityGate::new();
        let mut probe = FakeProbe {
            connected: true,
            discover_result: false,
            discover_calls: 0,
        };

        assert_eq!(
            gate.probe(&mut probe, "sig", "en"),
            Transition::Restored {
                discovered: Some(false)
            }
        );
        for _ in 0..10 {
            assert_eq!(gate.probe(&mut probe, "sig", "en"), Transition::Unchanged);
        }

        assert_eq!(probe.discover_calls, 1);
        assert!(!gate.state().cast_ready);
        assert_eq!(gate.state().indicator_mode(), IndicatorMode::NoCast);
    }

    #[test]
    fn reconnect_edge_retries_failed_discovery() {
        let mut gate = ConnectivityGate::new();
        let mut probe = FakeProbe {
            connected: true,
            discover_result: false,
            discover_calls: 0,
        };
        gate.probe(&mut probe, "sig", "en");

        probe.connected = false;
        assert_eq!(gate.probe(&mut probe, "sig", "en"), Transition::Lost);
        assert_eq!(gate.state().indicator_mode(), IndicatorMode::Searching);

        probe.connected = true;
        probe.discover_result = true;
        gate.probe(&mut probe, "sig", "en");

        assert_eq!(probe.discover_calls, 2);
        assert!(gate.state().can_dispatch());
        assert_eq!(gate.discovery_attempts(), 2);
    }

    #[test]
    fn known_device_is_not_rediscovered() {
        let mut gate = ConnectivityGate::new();
        let mut probe = FakeProbe {
            connected: true,
            discover_result: true,
            discover_calls: 0,
        };
        gate.probe(&mut probe, "sig", "en");
        probe.connected = false;
        gate.probe(&mut probe, "sig", "en");
        assert!(!gate.state().can_dispatch());

        probe.connected = true;
        assert_eq!(
            gate.probe(&mut probe, "sig", "en"),
            Transition::Restored { discovered: None }
        );
        assert_eq!(probe.discover_calls, 1);
        assert!(gate.state().can_dispatch());
    }

    #[test]
    fn blink_patterns_follow_mode() {
        assert!(indicator_lit(IndicatorMode::Steady, 123_456));
        assert!(indicator_lit(IndicatorMode::NoCast, 0));
        assert!(!indicator_lit(IndicatorMode::NoCast, 200));
        assert!(indicator_lit(IndicatorMode::Searching, 899));
        assert!(!indicator_lit(IndicatorMode::Searching, 900));
    }

    #[test]
    fn driver_skips_redundant_writes() {
        let mut driver = IndicatorDriver::default();
        let mut led = RecordingLed::default();

        driver.refresh(&mut led, IndicatorMode::Steady, 0);
        driver.refresh(&mut led, IndicatorMode::Steady, 200);
        driver.refresh(&mut led, IndicatorMode::NoCast, 200);
        driver.refresh(&mut led, IndicatorMode::NoCast, 400);

        assert_eq!(led.writes, vec![true, false, true]);
    }
}
