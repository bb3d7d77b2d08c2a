// ABOUTME: Transient user-visible notifications.
// ABOUTME: Queued by the workspace and drained by whatever draws them.

use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Information,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    /// How long the notification should stay visible
    pub timeout: Duration,
}

/// FIFO of notifications waiting to be shown
#[derive(Debug)]
pub struct NotificationQueue {
    pending: VecDeque<Notification>,
    default_timeout: Duration,
}

impl NotificationQueue {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            default_timeout,
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push_with(message, Severity::Information, self.default_timeout);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push_with(message, Severity::Warning, self.default_timeout);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push_with(message, Severity::Error, self.default_timeout);
    }

    pub fn push_with(&mut self, message: impl Into<String>, severity: Severity, timeout: Duration) {
        self.pending.push_back(Notification {
            message: message.into(),
            severity,
            timeout,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn take_pending(&mut self) -> Vec<Notification> {
        self.pending.drain(..).collect()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_order() {
        let mut queue = NotificationQueue::default();
        queue.info("saved");
        queue.error("failed");

        let drained = queue.take_pending();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "saved");
        assert_eq!(drained[0].severity, Severity::Information);
        assert_eq!(drained[1].severity, Severity::Error);
        assert_eq!(drained[1].timeout, Duration::from_secs(3));
        assert!(queue.is_empty());
    }
}
