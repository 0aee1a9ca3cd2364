use std::time::Duration;

use tokio::time::Instant;

/// How long a notification stays visible
pub const NOTIFICATION_DURATION: Duration = Duration::from_millis(3000);

/// A transient message shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub expires_at: Instant,
}

/// Identifies one `notify` call; only the latest ticket may dismiss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Single-slot holder for the current notification
///
/// Every `notify` replaces the previous message and invalidates its ticket, so
/// a dismissal scheduled for an older message cannot clear a newer one.
#[derive(Debug)]
pub struct NotificationSlot {
    current: Option<Notification>,
    generation: u64,
    duration: Duration,
}

impl NotificationSlot {
    pub fn new(duration: Duration) -> Self {
        Self {
            current: None,
            generation: 0,
            duration,
        }
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    /// Show `text` until `now + duration`, replacing any current message
    pub fn notify(&mut self, text: impl Into<String>, now: Instant) -> (Ticket, Instant) {
        self.generation += 1;
        let expires_at = now + self.duration;
        self.current = Some(Notification {
            text: text.into(),
            expires_at,
        });
        (Ticket(self.generation), expires_at)
    }

    /// Dismiss the notification if `ticket` is still the latest one
    ///
    /// Returns whether anything was cleared.
    pub fn expire(&mut self, ticket: Ticket) -> bool {
        if ticket.0 != self.generation || self.current.is_none() {
            return false;
        }
        self.clear();
        true
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

impl Default for NotificationSlot {
    fn default() -> Self {
        Self::new(NOTIFICATION_DURATION)
    }
}
