use core::convert::TryInto;
use std::{
    sync::OnceLock,
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use embedded_svc::{
    http::{client::Client as HttpClient, Method, Status},
    io::{Read, Write},
    wifi::{AuthMethod, ClientConfiguration, Configuration},
};
use esp_idf_hal::gpio::{Output, PinDriver};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{gpio::AnyOutputPin, modem::Modem, prelude::Peripherals},
    http::client::{Configuration as HttpClientConfiguration, EspHttpConnection},
    log::EspLogger,
    nvs::{EspDefaultNvsPartition, EspNvs},
    sntp::{EspSntp, SyncStatus},
    wifi::{BlockingWifi, EspWifi},
};
use log::{debug, info, warn};

use crate::bridge::{device_endpoint, discovery_url, play_reply, PlayRequest};
use notifier_common::{
    config::NetworkConfig, parse_occupancy, Collaborators, ConnectivityProbe, DeviceError,
    DispatchGate, FeedFetcher, FetchError, Notifier, RuntimeConfig, StatusIndicator, TimeSource,
};

const NVS_NAMESPACE: &str = "notifier";
const NVS_RUNTIME_KEY: &str = "runtime_json";
const MAX_HTTP_BODY: usize = 16 * 1024;
const WIFI_RESTART_GRACE_MS: u64 = 300_000;
const WIFI_CONNECT_ATTEMPTS: u32 = 5;
const WIFI_RETRY_DELAY_MS: u64 = 3_000;
const STATUS_LED_PIN: i32 = 2;
const STATUS_LED_ACTIVE_LOW: bool = true;
/// Anything earlier means SNTP has not set the RTC yet.
const MIN_PLAUSIBLE_EPOCH: i64 = 1_600_000_000;

struct StatusLed {
    pin: PinDriver<'static, AnyOutputPin, Output>,
}

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let mut runtime = load_runtime_config(&nvs_partition).unwrap_or_else(|err| {
        warn!("failed to load runtime config from NVS: {err:#}");
        RuntimeConfig::default()
    });
    ensure_build_defaults(&mut runtime);
    runtime.sanitize();

    info!(
        "notifier config: ssid=`{}`, signal=`{}`, board=`{}`",
        runtime.network.wifi_ssid, runtime.notifier.signal_id, runtime.notifier.notice_board_id,
    );

    let Peripherals { modem, .. } = Peripherals::take()?;
    let wifi = connect_wifi(modem, sys_loop, nvs_partition, &runtime.network)
        .context("wifi startup failed")?;
    disable_wifi_power_save();

    let sntp = EspSntp::new_default().context("failed to start SNTP")?;
    info!("SNTP initialized");

    init_watchdog(runtime.intervals.watchdog_timeout_secs())?;

    let board = EspBoard::new(&runtime, sntp)?;
    spawn_control_loop(runtime, board)?;

    // Keep services alive for the program lifetime.
    let _wifi = wifi;

    loop {
        thread::sleep(Duration::from_secs(60));
    }
}

fn ensure_build_defaults(runtime: &mut RuntimeConfig) {
    if runtime.network.wifi_ssid.is_empty() {
        if let Some(ssid) = option_env!("WIFI_SSID") {
            runtime.network.wifi_ssid = ssid.to_string();
        }
    }

    if runtime.network.wifi_pass.is_empty() {
        if let Some(pass) = option_env!("WIFI_PASS") {
            runtime.network.wifi_pass = pass.to_string();
        }
    }

    if let Some(signal_id) = option_env!("SIGNAL_ID") {
        runtime.notifier.signal_id = signal_id.to_string();
        runtime.notifier.notice_board_id = signal_id.to_string();
    }
    if let Some(bridge) = option_env!("CAST_BRIDGE_URL") {
        runtime.cast.bridge_url = Some(bridge.to_string());
    }
}

fn load_runtime_config(partition: &EspDefaultNvsPartition) -> anyhow::Result<RuntimeConfig> {
    let nvs = EspNvs::new(partition.clone(), NVS_NAMESPACE, true)?;
    let mut buffer = vec![0_u8; 4096];

    match nvs.get_str(NVS_RUNTIME_KEY, &mut buffer)? {
        Some(value) => Ok(serde_json::from_str::<RuntimeConfig>(value)?),
        None => Ok(RuntimeConfig::default()),
    }
}

fn connect_wifi(
    modem: Modem,
    sys_loop: EspSystemEventLoop,
    nvs_partition: EspDefaultNvsPartition,
    network: &NetworkConfig,
) -> anyhow::Result<EspWifi<'static>> {
    if network.wifi_ssid.is_empty() {
        return Err(anyhow!("wifi ssid missing; build with WIFI_SSID set"));
    }

    let mut esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs_partition))?;
    let mut wifi = BlockingWifi::wrap(&mut esp_wifi, sys_loop)?;

    let auth_method = if network.wifi_pass.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPAWPA2Personal
    };

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: network
            .wifi_ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("wifi ssid too long"))?,
        password: network
            .wifi_pass
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("wifi password too long"))?,
        auth_method,
        ..Default::default()
    }))?;

    wifi.start()?;
    info!("wifi started, connecting to `{}`", network.wifi_ssid);

    for attempt in 1..=WIFI_CONNECT_ATTEMPTS {
        info!("wifi connect attempt {attempt}/{WIFI_CONNECT_ATTEMPTS}");
        match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
            Ok(()) => {
                info!("wifi connected and netif up on attempt {attempt}");
                break;
            }
            Err(err) => warn!("wifi connect failed on attempt {attempt}: {err:#}"),
        }

        if attempt < WIFI_CONNECT_ATTEMPTS {
            let _ = wifi.disconnect();
            thread::sleep(Duration::from_millis(WIFI_RETRY_DELAY_MS));
        }
    }

    // The control loop reports the offline state and restarts after a grace period.
    Ok(esp_wifi)
}

fn spawn_control_loop(runtime: RuntimeConfig, mut board: EspBoard) -> anyhow::Result<()> {
    let period = Duration::from_millis(runtime.intervals.indicator_ms);
    let timezone = runtime.timezone.clone();
    let mut notifier = Notifier::new(runtime);

    thread::Builder::new()
        .name("control-loop".into())
        .stack_size(16 * 1024)
        .spawn(move || {
            if let Err(err) = add_current_task_to_watchdog() {
                warn!("failed to register control loop with watchdog: {err:#}");
            }

            let mut wifi_disconnected_since_ms: Option<u64> = None;
            let mut last_played = 0_u64;

            loop {
                feed_watchdog();
                let now_ms = monotonic_ms();

                let report = notifier.tick(now_ms, &mut board.collaborators());

                if report.connectivity.network_ready {
                    wifi_disconnected_since_ms = None;
                } else if let Some(disconnected_since_ms) = wifi_disconnected_since_ms {
                    if now_ms.saturating_sub(disconnected_since_ms) >= WIFI_RESTART_GRACE_MS {
                        warn!(
                            "wifi disconnected for {}s; restarting device for recovery",
                            WIFI_RESTART_GRACE_MS / 1000
                        );
                        thread::sleep(Duration::from_millis(100));
                        unsafe { esp_idf_svc::sys::esp_restart() };
                    }
                } else {
                    wifi_disconnected_since_ms = Some(now_ms);
                }

                if notifier.played_count() != last_played {
                    last_played = notifier.played_count();
                    let status = notifier.status(now_ms);
                    info!(
                        "played {} notification(s); local time {}",
                        last_played,
                        format_local(status.now_epoch, &timezone).unwrap_or_default()
                    );
                }

                thread::sleep(period);
            }
        })
        .context("failed to spawn control loop thread")?;
    Ok(())
}

/// Board-level collaborators for one notifier.
struct EspBoard {
    probe: WifiProbe,
    clock: SntpClock,
    fetcher: EspFetcher,
    gate: RoomGate,
    indicator: LedIndicator,
}

impl EspBoard {
    fn new(runtime: &RuntimeConfig, sntp: EspSntp<'static>) -> anyhow::Result<Self> {
        let timeout = Duration::from_millis(runtime.intervals.transport_timeout_ms);
        let bridge = CastBridge {
            http: EspFetcher { timeout },
            base_url: runtime.cast.bridge_url.clone(),
        };

        Ok(Self {
            probe: WifiProbe {
                bridge: bridge.clone(),
            },
            clock: SntpClock { sntp },
            fetcher: EspFetcher { timeout },
            gate: RoomGate {
                status: EspFetcher { timeout },
                status_url: runtime.notifier.status_url(),
                bridge,
                signal_id: runtime.notifier.signal_id.clone(),
                locale: runtime.notifier.locale.clone(),
            },
            indicator: LedIndicator {
                led: init_status_led(STATUS_LED_PIN),
            },
        })
    }

    fn collaborators(&mut self) -> Collaborators<'_> {
        Collaborators {
            probe: &mut self.probe,
            clock: &mut self.clock,
            fetcher: &mut self.fetcher,
            gate: &mut self.gate,
            indicator: &mut self.indicator,
        }
    }
}

struct SntpClock {
    sntp: EspSntp<'static>,
}

impl TimeSource for SntpClock {
    fn unix_time(&mut self) -> i64 {
        let now = Utc::now().timestamp();
        if self.sntp.get_sync_status() == SyncStatus::Completed || now >= MIN_PLAUSIBLE_EPOCH {
            now
        } else {
            0
        }
    }
}

#[derive(Clone, Copy)]
struct EspFetcher {
    timeout: Duration,
}

impl EspFetcher {
    fn client(&self) -> Result<HttpClient<EspHttpConnection>, String> {
        let http_conf = HttpClientConfiguration {
            timeout: Some(self.timeout),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        EspHttpConnection::new(&http_conf)
            .map(HttpClient::wrap)
            .map_err(|err| format!("{err:?}"))
    }

    /// Sends one request and returns the status with the (bounded) body.
    /// Feeds the task watchdog between blocking steps, so a tick with several
    /// slow calls never outlives it.
    fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> Result<(u16, String), String> {
        feed_watchdog();
        let mut client = self.client()?;
        let content_length = body.map(|body| body.len().to_string());
        let mut headers = vec![];
        if let Some(length) = content_length.as_deref() {
            headers.push(("Content-Type", "application/json"));
            headers.push(("Content-Length", length));
        }

        let mut request = client
            .request(method, url, &headers)
            .map_err(|err| format!("{err:?}"))?;
        if let Some(body) = body {
            request.write_all(body).map_err(|err| format!("{err:?}"))?;
            request.flush().map_err(|err| format!("{err:?}"))?;
        }
        let mut response = request.submit().map_err(|err| format!("{err:?}"))?;
        feed_watchdog();
        let status = response.status();

        let mut raw = Vec::new();
        let mut chunk = [0_u8; 1024];
        loop {
            let read = response.read(&mut chunk).map_err(|err| format!("{err:?}"))?;
            feed_watchdog();
            if read == 0 {
                break;
            }
            if raw.len() + read > MAX_HTTP_BODY {
                return Err(format!("response body exceeds {MAX_HTTP_BODY} bytes"));
            }
            raw.extend_from_slice(&chunk[..read]);
        }

        Ok((status, String::from_utf8_lossy(&raw).into_owned()))
    }
}

impl FeedFetcher for EspFetcher {
    fn fetch(&mut self, url: &str) -> Result<String, FetchError> {
        let (status, body) = self.send(Method::Get, url, None).map_err(FetchError::Transport)?;
        if !(200..300).contains(&status) {
            return Err(FetchError::Status(status));
        }
        Ok(body)
    }
}

struct WifiProbe {
    bridge: CastBridge,
}

impl ConnectivityProbe for WifiProbe {
    fn is_network_connected(&mut self) -> bool {
        is_wifi_station_connected()
    }

    fn discover_device(&mut self, signal_id: &str, locale: &str) -> bool {
        self.bridge.discover(signal_id, locale)
    }
}

struct RoomGate {
    status: EspFetcher,
    status_url: String,
    bridge: CastBridge,
    signal_id: String,
    locale: String,
}

impl DispatchGate for RoomGate {
    fn is_free(&mut self) -> bool {
        match self.status.fetch(&self.status_url) {
            Ok(raw) => parse_occupancy(&raw).unwrap_or(false),
            Err(err) => {
                debug!("occupancy check failed: {err}");
                false
            }
        }
    }

    fn play(&mut self, message: &str) -> Result<(), DeviceError> {
        self.bridge.play(&self.signal_id, &self.locale, message)
    }
}

struct LedIndicator {
    led: Option<StatusLed>,
}

impl StatusIndicator for LedIndicator {
    fn set_lit(&mut self, lit: bool) {
        let Some(led) = self.led.as_mut() else {
            return;
        };

        let result = if lit != STATUS_LED_ACTIVE_LOW {
            led.pin.set_high()
        } else {
            led.pin.set_low()
        };

        if let Err(err) = result {
            warn!("failed to drive status LED: {err}");
        }
    }
}

#[derive(Clone)]
struct CastBridge {
    http: EspFetcher,
    base_url: Option<String>,
}

impl CastBridge {
    fn discover(&self, signal_id: &str, locale: &str) -> bool {
        let Some(base_url) = self.base_url.as_deref() else {
            warn!("no cast bridge configured; cast device `{signal_id}` unavailable");
            return false;
        };

        match self
            .http
            .send(Method::Get, &discovery_url(base_url, signal_id, locale), None)
        {
            Ok((status, _)) => (200..300).contains(&status),
            Err(err) => {
                warn!("cast discovery request failed: {err}");
                false
            }
        }
    }

    fn play(&self, signal_id: &str, locale: &str, message: &str) -> Result<(), DeviceError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| DeviceError::Unreachable("no cast bridge configured".to_string()))?;

        let url = device_endpoint(base_url, signal_id, Some("play"));
        let body = serde_json::to_vec(&PlayRequest {
            url: message,
            locale,
        })
        .map_err(|err| DeviceError::Rejected(err.to_string()))?;

        let (status, _) = self
            .http
            .send(Method::Post, &url, Some(&body))
            .map_err(DeviceError::Unreachable)?;
        play_reply(status)
    }
}

fn init_watchdog(timeout_sec: u32) -> anyhow::Result<()> {
    let config = esp_idf_svc::sys::esp_task_wdt_config_t {
        timeout_ms: timeout_sec.saturating_mul(1000),
        idle_core_mask: 0,
        trigger_panic: true,
    };
    let rc = unsafe { esp_idf_svc::sys::esp_task_wdt_init(&config) };
    if rc == esp_idf_svc::sys::ESP_OK || rc == esp_idf_svc::sys::ESP_ERR_INVALID_STATE {
        return Ok(());
    }
    Err(anyhow!("esp_task_wdt_init failed with code {}", rc))
}

fn add_current_task_to_watchdog() -> anyhow::Result<()> {
    let rc = unsafe { esp_idf_svc::sys::esp_task_wdt_add(core::ptr::null_mut()) };
    if rc == esp_idf_svc::sys::ESP_OK || rc == esp_idf_svc::sys::ESP_ERR_INVALID_STATE {
        return Ok(());
    }
    Err(anyhow!("esp_task_wdt_add failed with code {}", rc))
}

fn feed_watchdog() {
    let _ = unsafe { esp_idf_svc::sys::esp_task_wdt_reset() };
}

fn disable_wifi_power_save() {
    let rc = unsafe { esp_idf_svc::sys::esp_wifi_set_ps(0) };
    if rc == esp_idf_svc::sys::ESP_OK {
        info!("wifi power save disabled");
    } else {
        warn!("failed to disable wifi power save: esp_err_t={rc}");
    }
}

fn is_wifi_station_connected() -> bool {
    let mut ap_info = esp_idf_svc::sys::wifi_ap_record_t::default();
    let rc = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
    rc == esp_idf_svc::sys::ESP_OK
}

fn init_status_led(pin: i32) -> Option<StatusLed> {
    let driver = unsafe { PinDriver::output(AnyOutputPin::new(pin)) };
    match driver {
        Ok(mut pin) => {
            let off = if STATUS_LED_ACTIVE_LOW {
                pin.set_high()
            } else {
                pin.set_low()
            };
            if let Err(err) = off {
                warn!("failed to reset status LED: {err}");
            }
            Some(StatusLed { pin })
        }
        Err(err) => {
            warn!("status LED unavailable on GPIO{pin}: {err}");
            None
        }
    }
}

fn format_local(epoch: i64, timezone: &str) -> Option<String> {
    if epoch <= 0 {
        return None;
    }
    let tz: Tz = timezone.parse().ok()?;
    DateTime::<Utc>::from_timestamp(epoch, 0).map(|utc| utc.with_timezone(&tz).to_rfc3339())
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
