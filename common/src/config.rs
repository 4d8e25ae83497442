use serde::{Deserialize, Serialize};

pub const DEFAULT_LOCALE: &str = "en";
pub const DEFAULT_PORT: u16 = 443;
pub const CONNECTED_SOUND_URL: &str =
    "https://actions.google.com/sounds/v1/cartoon/concussive_hit_guitar_boing.ogg";
pub const MIN_WATCHDOG_TIMEOUT_SECS: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotifierConfig {
    pub signal_id: String,
    pub locale: String,
    pub feed_host: String,
    pub port: u16,
    #[serde(default = "default_tls")]
    pub tls: bool,
    pub connection_path: String,
    pub notice_board_id: String,
    pub tolerance_secs: i64,
}

fn default_tls() -> bool {
    true
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            signal_id: "your-signal-id".to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            feed_host: "firebasestorage.googleapis.com".to_string(),
            port: DEFAULT_PORT,
            tls: true,
            connection_path: "/v0/b/notice-board.appspot.com/o/notifiers%2F".to_string(),
            notice_board_id: "your-signal-id".to_string(),
            tolerance_secs: 300,
        }
    }
}

impl NotifierConfig {
    pub fn feed_url(&self) -> String {
        self.board_url("")
    }

    pub fn status_url(&self) -> String {
        self.board_url("-status")
    }

    fn board_url(&self, suffix: &str) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        let default_port = if self.tls { 443 } else { 80 };
        let authority = if self.port == default_port {
            self.feed_host.clone()
        } else {
            format!("{}:{}", self.feed_host, self.port)
        };

        format!(
            "{scheme}://{authority}{}{}{suffix}.json?alt=media",
            self.connection_path, self.notice_board_id
        )
    }

    pub fn sanitize(&mut self) {
        self.tolerance_secs = self.tolerance_secs.clamp(1, 3_600);
        if self.port == 0 {
            self.port = if self.tls { DEFAULT_PORT } else { 80 };
        }
        if self.locale.trim().is_empty() {
            self.locale = DEFAULT_LOCALE.to_string();
        }
        if self.notice_board_id.trim().is_empty() {
            self.notice_board_id = self.signal_id.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntervalConfig {
    pub indicator_ms: u64,
    pub time_sync_ms: u64,
    pub feed_refresh_ms: u64,
    pub dispatch_ms: u64,
    /// Retry spacing while the clock is unsynchronized or no feed is cached.
    pub retry_ms: u64,
    pub transport_timeout_ms: u64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            indicator_ms: 200,
            time_sync_ms: 60_000,
            feed_refresh_ms: 300_000,
            dispatch_ms: 120_000,
            retry_ms: 5_000,
            transport_timeout_ms: 10_000,
        }
    }
}

impl IntervalConfig {
    pub fn sanitize(&mut self) {
        self.indicator_ms = self.indicator_ms.clamp(50, 5_000);
        self.time_sync_ms = self.time_sync_ms.max(1_000);
        self.feed_refresh_ms = self.feed_refresh_ms.max(1_000);
        self.dispatch_ms = self.dispatch_ms.max(1_000);
        self.retry_ms = self.retry_ms.clamp(self.indicator_ms, 60_000);
        self.transport_timeout_ms = self.transport_timeout_ms.clamp(1_000, 60_000);
    }

    /// Task watchdog budget for the control loop. The loop feeds the watchdog
    /// between blocking transport steps, so the budget covers one connect plus
    /// one read at the transport timeout, with margin.
    pub fn watchdog_timeout_secs(&self) -> u32 {
        let transport_secs = u32::try_from(self.transport_timeout_ms.div_ceil(1_000)).unwrap_or(u32::MAX);
        transport_secs
            .saturating_mul(2)
            .saturating_add(10)
            .max(MIN_WATCHDOG_TIMEOUT_SECS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastConfig {
    #[serde(default)]
    pub bridge_url: Option<String>,
    /// `null` disables the chime; leaving the key out keeps the default sound.
    #[serde(default = "default_connected_sound")]
    pub connected_sound_url: Option<String>,
}

fn default_connected_sound() -> Option<String> {
    Some(CONNECTED_SOUND_URL.to_string())
}

impl Default for CastConfig {
    fn default() -> Self {
        Self {
            bridge_url: None,
            connected_sound_url: default_connected_sound(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub intervals: IntervalConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub cast: CastConfig,
    pub timezone: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            notifier: NotifierConfig::default(),
            intervals: IntervalConfig::default(),
            network: NetworkConfig::default(),
            cast: CastConfig::default(),
            timezone: "Asia/Singapore".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.notifier.sanitize();
        self.intervals.sanitize();
        if let Some(bridge) = self.cast.bridge_url.as_mut() {
            let trimmed = bridge.trim().trim_end_matches('/').to_string();
            *bridge = trimmed;
        }
        if self.cast.bridge_url.as_deref() == Some("") {
            self.cast.bridge_url = None;
        }
    }
}
