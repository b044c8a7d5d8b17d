//! Fire-and-forget notification dispatch shared by the services.

use std::sync::Arc;

use tracing::warn;

use super::ports::NotificationSink;
use super::{GroupId, Member, Notification, NotificationKind, UserId};

/// Sends notifications and swallows failures after logging them.
#[derive(Clone)]
pub(crate) struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub(crate) fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub(crate) async fn send(&self, notification: Notification) {
        if let Err(error) = self.sink.notify(&notification).await {
            warn!(
                %error,
                user_id = %notification.user_id,
                group_id = %notification.group_id,
                kind = %notification.kind,
                "notification delivery failed"
            );
        }
    }

    /// Send the same message to each member, skipping `except` when given.
    pub(crate) async fn broadcast(
        &self,
        members: &[Member],
        except: Option<UserId>,
        group_id: GroupId,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) {
        for member in members.iter().filter(|m| Some(m.user_id) != except) {
            self.send(Notification::new(member.user_id, group_id, kind, title, message))
                .await;
        }
    }
}
