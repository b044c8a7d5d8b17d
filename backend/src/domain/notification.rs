//! Notifications emitted by group operations.
//!
//! Delivery is fire-and-forget: services hand notifications to the
//! [`NotificationSink`](crate::domain::ports::NotificationSink) and only log
//! failures. Stored notifications are read back through the
//! [`NotificationInbox`](crate::domain::ports::NotificationInbox).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::text_enum::text_enum;
use super::{GroupId, UserId};

text_enum! {
    /// Category of a notification, used by clients for routing and icons.
    pub enum NotificationKind as "notification kind" {
        /// A user asked to join a group.
        JoinRequest => "join_request",
        /// A join request was approved.
        MembershipApproved => "membership_approved",
        /// A join request was rejected.
        MembershipRejected => "membership_rejected",
        /// A group reached its minimum member count.
        GroupReady => "group_ready",
        /// The creator approved the group.
        GroupApproved => "group_approved",
        /// The group was activated.
        GroupActivated => "group_activated",
        /// A member was promoted to admin.
        AdminPromotion => "admin_promotion",
        /// An admin raised a payout request.
        PayoutRequest => "payout_request",
        /// A payout completed.
        PayoutCompleted => "payout_completed",
        /// A payout transfer failed.
        PayoutFailed => "payout_failed",
        /// A round payout was authorised.
        RoundPayoutAuthorized => "round_payout_authorized",
        /// A contribution deadline is approaching.
        ContributionReminder => "contribution_reminder",
        /// An admin invited the user to a group.
        GroupInvitation => "group_invitation",
    }
}

/// Message addressed to one user about one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Recipient.
    pub user_id: UserId,
    /// Group the message concerns.
    pub group_id: GroupId,
    /// Category.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
}

impl Notification {
    /// Build a notification.
    pub fn new(
        user_id: UserId,
        group_id: GroupId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            group_id,
            kind,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// A stored notification as listed in the recipient's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxEntry {
    /// Store-assigned identifier, unique across users.
    pub id: i64,
    pub notification: Notification,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
