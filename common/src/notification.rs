use crate::types::{Event, NotificationView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: i64,
    pub start_time: i64,
    pub kind: String,
    pub intent_kind: String,
    pub message: String,
    pub played: bool,
}

impl Notification {
    fn pending(event: Event) -> Self {
        Self {
            id: event.id,
            start_time: event.start_time,
            kind: event.kind,
            intent_kind: event.intent_kind,
            message: event.message,
            played: false,
        }
    }

    pub fn is_same_event(&self, event: &Event) -> bool {
        self.id == event.id && self.start_time == event.start_time
    }

    pub fn view(&self) -> NotificationView {
        NotificationView {
            id: self.id,
            start_time: self.start_time,
            kind: self.kind.clone(),
            intent_kind: self.intent_kind.clone(),
            msg: self.message.clone(),
            played: self.played,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Same event, already played. Must not be dispatched again.
    Unchanged,
    /// Same event, not played yet. Dispatch may be retried.
    StillPending,
    /// A different event took over and is now pending.
    Replaced,
}

/// Holds the most recently selected event. Starts empty, which behaves like
/// an already-played placeholder.
#[derive(Debug, Clone, Default)]
pub struct NotificationState {
    current: Option<Notification>,
}

impl NotificationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> Option<&Notification> {
        self.current.as_ref().filter(|notification| !notification.played)
    }

    pub fn update(&mut self, selected: Event) -> UpdateOutcome {
        if let Some(current) = self.current.as_ref() {
            if current.is_same_event(&selected) {
                return if current.played {
                    UpdateOutcome::Unchanged
                } else {
                    UpdateOutcome::StillPending
                };
            }
        }

        self.current = Some(Notification::pending(selected));
        UpdateOutcome::Replaced
    }

    pub fn mark_played(&mut self) {
        if let Some(current) = self.current.as_mut() {
            current.played = true;
        }
    }
}
