use std::{
    io::ErrorKind,
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    path::PathBuf,
    sync::{Arc, OnceLock},
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::{blocking::Client, Url};
use tokio::{
    net::TcpListener,
    sync::{oneshot, watch},
};
use tracing::{debug, info, warn};

use crate::bridge::{device_endpoint, discovery_url, play_reply, PlayRequest};
use notifier_common::{
    parse_occupancy, Collaborators, ConnectivityProbe, DeviceError, DispatchGate, FeedFetcher,
    FetchError, Notifier, NotifierStatus, RuntimeConfig, StatusIndicator, TimeSource,
};

const DEFAULT_HTTP_PORT: u16 = 8080;
const NETWORK_RECHECK: Duration = Duration::from_secs(5);

#[derive(Clone)]
struct AppState {
    status: watch::Receiver<NotifierStatus>,
    timezone: Arc<String>,
}

#[derive(Clone)]
struct AppStore {
    runtime_path: Arc<PathBuf>,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::new();
    let mut runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });
    apply_env_overrides(&mut runtime, |key| std::env::var(key).ok());
    runtime.sanitize();

    info!(
        "notifier config: signal=`{}`, board=`{}`, feed=`{}`, bridge={}",
        runtime.notifier.signal_id,
        runtime.notifier.notice_board_id,
        runtime.notifier.feed_url(),
        runtime.cast.bridge_url.as_deref().unwrap_or("simulated"),
    );

    let notifier = Notifier::new(runtime.clone());
    let (status_tx, status_rx) = watch::channel(notifier.status(monotonic_ms()));
    spawn_control_loop(runtime.clone(), notifier, status_tx)?
        .await
        .context("control loop exited during startup")??;

    let app_state = AppState {
        status: status_rx,
        timezone: Arc::new(runtime.timezone),
    };
    let app = Router::new()
        .route("/api/status", get(handle_get_status))
        .with_state(app_state);

    let port = http_port(|key| std::env::var(key).ok());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind notifier server at {addr}"))?;

    info!("notifier status listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// The control loop makes blocking HTTP calls, so it runs on its own OS
/// thread rather than on the async runtime. The returned receiver resolves
/// once the board collaborators are built, or with the reason they were not.
fn spawn_control_loop(
    runtime: RuntimeConfig,
    mut notifier: Notifier,
    status_tx: watch::Sender<NotifierStatus>,
) -> anyhow::Result<oneshot::Receiver<anyhow::Result<()>>> {
    let (started_tx, started_rx) = oneshot::channel();
    thread::Builder::new()
        .name("control-loop".into())
        .spawn(move || {
            let mut board = match HostBoard::new(&runtime) {
                Ok(board) => {
                    let _ = started_tx.send(Ok(()));
                    board
                }
                Err(err) => {
                    let _ = started_tx.send(Err(err));
                    return;
                }
            };
            let period = Duration::from_millis(runtime.intervals.indicator_ms);

            loop {
                let now_ms = monotonic_ms();
                let report = notifier.tick(now_ms, &mut board.collaborators());
                if let Some(id) = report.dispatched {
                    debug!("tick at {now_ms}ms dispatched event {id}");
                }
                status_tx.send_replace(notifier.status(now_ms));

                thread::sleep(period);
            }
        })
        .context("failed to spawn control loop thread")?;
    Ok(started_rx)
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let mut status = state.status.borrow().clone();
    status.now_local = format_local(status.now_epoch, &state.timezone);
    Json(status)
}

/// Host-side collaborators for one notifier.
struct HostBoard {
    probe: NetworkProbe,
    clock: SystemClock,
    fetcher: HttpFetcher,
    gate: RoomGate,
    indicator: LogIndicator,
}

impl HostBoard {
    fn new(runtime: &RuntimeConfig) -> anyhow::Result<Self> {
        if let Some(bridge_url) = runtime.cast.bridge_url.as_deref() {
            Url::parse(bridge_url)
                .with_context(|| format!("invalid cast bridge url `{bridge_url}`"))?;
        }

        let timeout = Duration::from_millis(runtime.intervals.transport_timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("notifier-device/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        let bridge = CastBridge {
            client: client.clone(),
            base_url: runtime.cast.bridge_url.clone(),
        };

        Ok(Self {
            probe: NetworkProbe {
                target: format!("{}:{}", runtime.notifier.feed_host, runtime.notifier.port),
                timeout,
                bridge: bridge.clone(),
                checked_at: None,
                connected: false,
            },
            clock: SystemClock,
            fetcher: HttpFetcher {
                client: client.clone(),
            },
            gate: RoomGate {
                status: HttpFetcher { client },
                status_url: runtime.notifier.status_url(),
                bridge,
                signal_id: runtime.notifier.signal_id.clone(),
                locale: runtime.notifier.locale.clone(),
            },
            indicator: LogIndicator,
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

struct SystemClock;

impl TimeSource for SystemClock {
    fn unix_time(&mut self) -> i64 {
        Utc::now().timestamp().max(0)
    }
}

struct HttpFetcher {
    client: Client,
}

impl FeedFetcher for HttpFetcher {
    fn fetch(&mut self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .text()
            .map_err(|err| FetchError::Transport(err.to_string()))
    }
}

/// Reachability of the feed host, re-checked at most every few seconds.
struct NetworkProbe {
    target: String,
    timeout: Duration,
    bridge: CastBridge,
    checked_at: Option<Instant>,
    connected: bool,
}

impl ConnectivityProbe for NetworkProbe {
    fn is_network_connected(&mut self) -> bool {
        if let Some(checked_at) = self.checked_at {
            if checked_at.elapsed() < NETWORK_RECHECK {
                return self.connected;
            }
        }

        self.connected = match self.target.to_socket_addrs() {
            Ok(mut addrs) => addrs
                .next()
                .map(|addr| TcpStream::connect_timeout(&addr, self.timeout).is_ok())
                .unwrap_or(false),
            Err(err) => {
                debug!("failed to resolve {}: {err}", self.target);
                false
            }
        };
        self.checked_at = Some(Instant::now());
        self.connected
    }

    fn discover_device(&mut self, signal_id: &str, locale: &str) -> bool {
        self.bridge.discover(signal_id, locale)
    }
}

struct RoomGate {
    status: HttpFetcher,
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

struct LogIndicator;

impl StatusIndicator for LogIndicator {
    fn set_lit(&mut self, lit: bool) {
        debug!("status LED {}", if lit { "on" } else { "off" });
    }
}

/// HTTP front for the cast device. Without a base URL the device is simulated.
#[derive(Clone)]
struct CastBridge {
    client: Client,
    base_url: Option<String>,
}

impl CastBridge {
    fn discover(&self, signal_id: &str, locale: &str) -> bool {
        let Some(base_url) = self.base_url.as_deref() else {
            info!("no cast bridge configured; simulating device `{signal_id}`");
            return true;
        };

        match self.client.get(discovery_url(base_url, signal_id, locale)).send() {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                warn!("cast discovery request failed: {err}");
                false
            }
        }
    }

    fn play(&self, signal_id: &str, locale: &str, message: &str) -> Result<(), DeviceError> {
        let Some(base_url) = self.base_url.as_deref() else {
            info!("[simulated cast] `{signal_id}` playing {message}");
            return Ok(());
        };

        let url = device_endpoint(base_url, signal_id, Some("play"));
        let response = self
            .client
            .post(url)
            .json(&PlayRequest {
                url: message,
                locale,
            })
            .send()
            .map_err(|err| DeviceError::Unreachable(err.to_string()))?;

        play_reply(response.status().as_u16())
    }
}

impl AppStore {
    fn new() -> Self {
        let data_dir = std::env::var("NOTIFIER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.notifier"));

        Self::in_dir(data_dir)
    }

    fn in_dir(data_dir: PathBuf) -> Self {
        Self {
            runtime_path: Arc::new(data_dir.join("runtime.json")),
        }
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        match tokio::fs::read(self.runtime_path.as_ref()).await {
            Ok(raw) => serde_json::from_slice::<RuntimeConfig>(&raw).with_context(|| {
                format!("invalid runtime config at {}", self.runtime_path.display())
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }
}

fn apply_env_overrides(runtime: &mut RuntimeConfig, lookup: impl Fn(&str) -> Option<String>) {
    let notifier = &mut runtime.notifier;
    if let Some(host) = lookup("FEED_HOST") {
        notifier.feed_host = host;
    }
    if let Some(port) = lookup("FEED_PORT").and_then(|value| value.parse::<u16>().ok()) {
        notifier.port = port;
    }
    if let Some(path) = lookup("FEED_PATH") {
        notifier.connection_path = path;
    }
    if let Some(board) = lookup("NOTICE_BOARD_ID") {
        notifier.notice_board_id = board;
    }
    if let Some(signal_id) = lookup("SIGNAL_ID") {
        notifier.signal_id = signal_id;
    }
    if let Some(locale) = lookup("NOTIFIER_LOCALE") {
        notifier.locale = locale;
    }
    if let Some(bridge) = lookup("CAST_BRIDGE_URL") {
        runtime.cast.bridge_url = Some(bridge);
    }
}

fn http_port(lookup: impl Fn(&str) -> Option<String>) -> u16 {
    lookup("NOTIFIER_HTTP_PORT")
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_HTTP_PORT)
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
