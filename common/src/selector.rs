use crate::types::Event;

/// Inclusive `[now - tolerance, now + tolerance]` range of acceptable start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptanceWindow {
    pub lower: i64,
    pub upper: i64,
}

impl AcceptanceWindow {
    pub fn around(now: i64, tolerance_secs: i64) -> Self {
        let tolerance = tolerance_secs.max(0);
        Self {
            lower: now.saturating_sub(tolerance),
            upper: now.saturating_add(tolerance),
        }
    }

    pub fn contains(&self, start_time: i64) -> bool {
        (self.lower..=self.upper).contains(&start_time)
    }
}

/// Picks the in-window event with the earliest start time.
///
/// The whole slice is scanned since feed order carries no meaning. On an exact
/// start-time tie the first one encountered is kept.
pub fn select_due(events: &[Event], now: i64, tolerance_secs: i64) -> Option<&Event> {
    let window = AcceptanceWindow::around(now, tolerance_secs);
    let mut best: Option<&Event> = None;

    for event in events.iter().filter(|event| window.contains(event.start_time)) {
        if best.map(|current| event.start_time < current.start_time).unwrap_or(true) {
            best = Some(event);
        }
    }

    best
}
