//! Invitations to join a group, issued by its admins.

use chrono::{DateTime, Duration, Utc};

use super::text_enum::text_enum;
use super::{EmailAddress, GroupId, InvitationId, UserId, UserIdentity};

/// Days an invitation stays open.
pub const INVITATION_TTL_DAYS: i64 = 7;

text_enum! {
    /// Lifecycle of an invitation.
    pub enum InvitationStatus as "invitation status" {
        /// Awaiting the invitee's answer.
        Pending => "pending",
        /// Accepted; a pending membership was created.
        Accepted => "accepted",
        /// Declined by the invitee.
        Rejected => "rejected",
    }
}

/// An admin's invitation for a registered user to join a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub id: InvitationId,
    pub group_id: GroupId,
    /// Admin or creator who sent it.
    pub inviter_id: UserId,
    pub invitee_id: UserId,
    /// Address the invitation was sent to.
    pub email: EmailAddress,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    /// A pending invitation for `invitee` expiring [`INVITATION_TTL_DAYS`]
    /// after `now`.
    #[must_use]
    pub fn issue(
        group_id: GroupId,
        inviter_id: UserId,
        invitee: &UserIdentity,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InvitationId::random(),
            group_id,
            inviter_id,
            invitee_id: invitee.id,
            email: invitee.email.clone(),
            status: InvitationStatus::Pending,
            created_at: now,
            expires_at: now + Duration::days(INVITATION_TTL_DAYS),
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, InvitationStatus::Pending)
    }

    /// Whether `at` is past the expiry time.
    #[must_use]
    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        at > self.expires_at
    }
}
