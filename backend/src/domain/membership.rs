//! Group membership records, roles and admin nominations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::text_enum::text_enum;
use super::{GroupId, UserId, WalletAddress};

text_enum! {
    /// Role a member holds inside one group.
    pub enum MemberRole as "member role" {
        /// Founded the group; exactly one per group.
        Creator => "creator",
        /// Promoted member allowed to run privileged operations.
        Admin => "admin",
        /// Regular contributor.
        Member => "member",
    }
}

text_enum! {
    /// Review state of a membership.
    pub enum MemberStatus as "member status" {
        /// Awaiting review by an admin.
        Pending => "pending",
        /// Counted towards quorum and rotation.
        Approved => "approved",
        /// Declined; kept for history.
        Rejected => "rejected",
    }
}

impl MemberStatus {
    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Only pending memberships can be reviewed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected)
        )
    }
}

text_enum! {
    /// State of an admin nomination.
    pub enum NominationStatus as "nomination status" {
        /// Counting towards promotion.
        Pending => "pending",
        /// Consumed by a promotion.
        Approved => "approved",
    }
}

/// A user's association with one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Owning group.
    pub group_id: GroupId,
    /// Member identity.
    pub user_id: UserId,
    /// Wallet contributions are debited from and payouts credited to.
    pub wallet: WalletAddress,
    /// Role inside the group.
    pub role: MemberRole,
    /// Review state.
    pub status: MemberStatus,
    /// When the record was created.
    pub joined_at: DateTime<Utc>,
}

impl Member {
    /// Whether the member may run privileged group operations.
    #[must_use]
    pub const fn is_admin_or_creator(&self) -> bool {
        matches!(self.role, MemberRole::Creator | MemberRole::Admin)
    }

    /// Whether the membership has been approved.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self.status, MemberStatus::Approved)
    }
}

/// One member's vote to promote another member to admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminNomination {
    /// Group the nomination belongs to.
    pub group_id: GroupId,
    /// Member casting the nomination.
    pub nominator_id: UserId,
    /// Member being nominated.
    pub nominee_id: UserId,
    /// Whether the nomination has been consumed.
    pub status: NominationStatus,
    /// When the nomination was cast.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(MemberStatus::Pending, MemberStatus::Approved, true)]
    #[case(MemberStatus::Pending, MemberStatus::Rejected, true)]
    #[case(MemberStatus::Approved, MemberStatus::Rejected, false)]
    #[case(MemberStatus::Rejected, MemberStatus::Approved, false)]
    #[case(MemberStatus::Pending, MemberStatus::Pending, false)]
    fn status_transitions(
        #[case] from: MemberStatus,
        #[case] to: MemberStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[rstest]
    #[case(MemberRole::Creator, true)]
    #[case(MemberRole::Admin, true)]
    #[case(MemberRole::Member, false)]
    fn privileged_roles(#[case] role: MemberRole, #[case] expected: bool) {
        let member = Member {
            group_id: GroupId::random(),
            user_id: UserId::random(),
            wallet: WalletAddress::new("GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7")
                .expect("valid wallet"),
            role,
            status: MemberStatus::Approved,
            joined_at: Utc::now(),
        };
        assert_eq!(member.is_admin_or_creator(), expected);
    }

    #[rstest]
    fn role_text_round_trips() {
        assert_eq!("admin".parse::<MemberRole>(), Ok(MemberRole::Admin));
        assert_eq!(MemberRole::Creator.as_str(), "creator");
    }
}
