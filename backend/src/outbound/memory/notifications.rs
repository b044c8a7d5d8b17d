//! In-memory notification inbox.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};

use crate::domain::ports::{NotificationError, NotificationInbox, NotificationSink};
use crate::domain::{InboxEntry, Notification, UserId};

#[derive(Default)]
struct Inbox {
    entries: Vec<InboxEntry>,
    last_id: i64,
}

/// Notification sink that keeps every notification in memory and serves
/// them back as an inbox.
///
/// Clones share the same inbox.
#[derive(Clone)]
pub struct MemoryNotificationSink {
    inbox: Arc<Mutex<Inbox>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryNotificationSink {
    fn default() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }
}

impl MemoryNotificationSink {
    /// Create an empty inbox stamped by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty inbox stamped by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inbox: Arc::new(Mutex::new(Inbox::default())),
            clock,
        }
    }

    fn inbox(&self) -> MutexGuard<'_, Inbox> {
        self.inbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every notification received, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<Notification> {
        self.inbox()
            .entries
            .iter()
            .map(|entry| entry.notification.clone())
            .collect()
    }

    /// Notifications addressed to `user_id`, oldest first.
    #[must_use]
    pub fn for_user(&self, user_id: UserId) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|notification| notification.user_id == user_id)
            .collect()
    }
}

#[async_trait]
impl NotificationSink for MemoryNotificationSink {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        let created_at = self.clock.utc();
        let mut inbox = self.inbox();
        inbox.last_id += 1;
        let id = inbox.last_id;
        inbox.entries.push(InboxEntry {
            id,
            notification: notification.clone(),
            is_read: false,
            created_at,
        });
        Ok(())
    }
}

#[async_trait]
impl NotificationInbox for MemoryNotificationSink {
    async fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> Result<Vec<InboxEntry>, NotificationError> {
        Ok(self
            .inbox()
            .entries
            .iter()
            .rev()
            .filter(|entry| entry.notification.user_id == user_id)
            .filter(|entry| !unread_only || !entry.is_read)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, user_id: UserId, id: i64) -> Result<bool, NotificationError> {
        let mut inbox = self.inbox();
        let Some(entry) = inbox
            .entries
            .iter_mut()
            .find(|entry| entry.id == id && entry.notification.user_id == user_id)
        else {
            return Ok(false);
        };
        entry.is_read = true;
        Ok(true)
    }
}
