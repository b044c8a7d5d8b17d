//! Per-user notification inbox.

use std::sync::Arc;

use tracing::debug;

use super::ports::{NotificationInbox, ServicePorts};
use super::{Error, InboxEntry, UserId};

/// Lists and acknowledges the notifications addressed to a user.
#[derive(Clone)]
pub struct NotificationService {
    inbox: Arc<dyn NotificationInbox>,
}

impl NotificationService {
    /// Build the service from the shared port bundle.
    #[must_use]
    pub fn new(ports: &ServicePorts) -> Self {
        Self {
            inbox: Arc::clone(&ports.inbox),
        }
    }

    /// The user's notifications, newest first.
    ///
    /// # Errors
    /// `ServiceUnavailable`/`InternalError` when the store fails.
    pub async fn list(&self, user_id: UserId, unread_only: bool) -> Result<Vec<InboxEntry>, Error> {
        Ok(self.inbox.list_for_user(user_id, unread_only).await?)
    }

    /// Mark one of the user's notifications read. Repeating the call is a
    /// no-op.
    ///
    /// # Errors
    /// `NotFound` when the notification does not exist or belongs to someone
    /// else.
    pub async fn mark_read(&self, user_id: UserId, id: i64) -> Result<(), Error> {
        if !self.inbox.mark_read(user_id, id).await? {
            return Err(Error::not_found("notification not found"));
        }
        debug!(user_id = %user_id, notification_id = id, "notification marked read");
        Ok(())
    }
}
