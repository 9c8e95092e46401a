use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationLevel {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationLevel::Info => "info",
            NotificationLevel::Success => "ok",
            NotificationLevel::Warning => "warn",
            NotificationLevel::Error => "error",
        }
    }
}

/// A user-facing message raised outside the normal return path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

/// Side channel for messages that must reach the user without failing the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn info(&self, message: String) {
        self.notify(Notification::new(NotificationLevel::Info, message));
    }

    fn success(&self, message: String) {
        self.notify(Notification::new(NotificationLevel::Success, message));
    }

    fn warning(&self, message: String) {
        self.notify(Notification::new(NotificationLevel::Warning, message));
    }

    fn error(&self, message: String) {
        self.notify(Notification::new(NotificationLevel::Error, message));
    }
}

const DEFAULT_CAPACITY: usize = 64;

/// Bounded queue of pending notifications, drained by the renderer.
pub struct NotificationCenter {
    pending: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Removes and returns every pending notification, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        self.lock().drain(..).collect()
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.lock().iter().filter(|n| n.is_error()).count()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        crate::lock(&self.pending)
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotificationCenter {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => log::warn!("{}", notification.message),
            _ => log::info!("{}", notification.message),
        }

        let mut pending = self.lock();
        while pending.len() >= self.capacity {
            pending.pop_front();
        }
        pending.push_back(notification);
    }
}
