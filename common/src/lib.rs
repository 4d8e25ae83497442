pub mod config;
pub mod connectivity;
pub mod error;
pub mod feed;
pub mod io;
pub mod notification;
pub mod scheduler;
pub mod selector;
pub mod types;

pub use config::{CastConfig, IntervalConfig, NetworkConfig, NotifierConfig, RuntimeConfig};
pub use connectivity::{ConnectivityGate, ConnectivityState, IndicatorDriver, Transition};
pub use error::{DeviceError, FetchError, NotifierError};
pub use feed::{parse_feed, parse_occupancy, FeedCache};
pub use io::{
    Collaborators, ConnectivityProbe, DispatchGate, FeedFetcher, StatusIndicator, TimeSource,
};
pub use notification::{Notification, NotificationState, UpdateOutcome};
pub use scheduler::{ActivityTimer, Notifier, TickReport, WallClock};
pub use selector::{select_due, AcceptanceWindow};
pub use types::{Event, IndicatorMode, NotificationView, NotifierStatus};
