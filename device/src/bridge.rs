//! Cast bridge endpoints and replies, shared by the host and board runtimes.

use serde::Serialize;

use notifier_common::DeviceError;

#[derive(Debug, Serialize)]
pub struct PlayRequest<'a> {
    pub url: &'a str,
    pub locale: &'a str,
}

/// `{base}/devices/{signal_id}[/{action}]` with the signal id percent-encoded.
pub fn device_endpoint(base_url: &str, signal_id: &str, action: Option<&str>) -> String {
    let mut url = format!(
        "{}/devices/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(signal_id)
    );
    if let Some(action) = action {
        url.push('/');
        url.push_str(action);
    }
    url
}

pub fn discovery_url(base_url: &str, signal_id: &str, locale: &str) -> String {
    format!(
        "{}?locale={}",
        device_endpoint(base_url, signal_id, None),
        urlencoding::encode(locale)
    )
}

/// Maps a playback reply: 5xx means the device is unreachable behind the
/// bridge, any other non-2xx is a rejection.
pub fn play_reply(status: u16) -> Result<(), DeviceError> {
    match status {
        200..=299 => Ok(()),
        500..=599 => Err(DeviceError::Unreachable(format!(
            "bridge returned HTTP {status}"
        ))),
        _ => Err(DeviceError::Rejected(format!("bridge returned HTTP {status}"))),
    }
}
