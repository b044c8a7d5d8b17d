//! Ports for the fire-and-forget notification collaborator and the inbox it
//! fills.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{InboxEntry, Notification, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by notification adapters.
    pub enum NotificationError {
        /// Delivery or storage failed.
        Delivery { message: String } => "notification delivery failed: {message}",
        /// Reading or updating stored notifications failed.
        Query { message: String } => "notification query failed: {message}",
    }
}

/// Accepts notifications for delivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Read side of the notification store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationInbox: Send + Sync {
    /// Notifications addressed to `user_id`, newest first.
    async fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> Result<Vec<InboxEntry>, NotificationError>;

    /// Mark notification `id` read; `false` when it does not exist or belongs
    /// to another user.
    async fn mark_read(&self, user_id: UserId, id: i64) -> Result<bool, NotificationError>;
}

/// Sink that only logs, used when no store is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureNotificationSink;

#[async_trait]
impl NotificationSink for FixtureNotificationSink {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        debug!(
            user_id = %notification.user_id,
            group_id = %notification.group_id,
            kind = %notification.kind,
            "notification dropped by fixture sink"
        );
        Ok(())
    }
}
