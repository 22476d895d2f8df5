//! Notification sink
//!
//! The engine reports recoverable failures and export results through a
//! caller-supplied sink. It never renders them itself.

use chrono::Local;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

/// Maximum number of notifications kept by `NotificationLog`
const MAX_NOTIFICATIONS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    pub timestamp: String,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn success(&self, message: &str) {
        self.notify(Notification::new(Severity::Success, message));
    }

    fn error(&self, message: &str) {
        self.notify(Notification::new(Severity::Error, message));
    }
}

/// Default sink: forwards notifications to tracing
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Info | Severity::Success => info!(target: "notify", "{}", notification.message),
            Severity::Warning => warn!(target: "notify", "{}", notification.message),
            Severity::Error => error!(target: "notify", "{}", notification.message),
        }
    }
}

/// Bounded in-memory history of notifications
#[derive(Clone, Default)]
pub struct NotificationLog {
    entries: Arc<Mutex<VecDeque<Notification>>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_recent(&self, count: usize) -> Vec<Notification> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().rev().take(count).rev().cloned().collect()
    }

    pub fn errors(&self) -> Vec<Notification> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter(|n| n.severity == Severity::Error)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= MAX_NOTIFICATIONS {
            entries.pop_front();
        }
        entries.push_back(notification);
    }
}
