//! Port for the membership registry, admin nominations and invitations.

use async_trait::async_trait;

use crate::domain::{
    AdminNomination, GroupId, Invitation, InvitationId, Member, MemberStatus, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by membership persistence adapters.
    pub enum MemberRepositoryError {
        /// Connection or pool failure.
        Connection { message: String } => "member repository connection failed: {message}",
        /// Query or row mapping failure.
        Query { message: String } => "member repository query failed: {message}",
        /// A record for the `(group, user)` pair already exists.
        DuplicateMember => "member already exists in group",
        /// The nominator already has a pending nomination for the nominee.
        DuplicateNomination => "nomination already recorded",
        /// No membership matches the `(group, user)` pair.
        MissingMember => "member not found",
        /// The invitee already has a pending invitation to the group.
        DuplicateInvitation => "invitation already pending",
    }
}

/// Persistence for [`Member`] records, [`AdminNomination`]s and
/// [`Invitation`]s.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Insert a membership; fails with `DuplicateMember` when one exists.
    async fn add(&self, member: &Member) -> Result<(), MemberRepositoryError>;

    /// Load the membership for `(group_id, user_id)`.
    async fn find(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<Option<Member>, MemberRepositoryError>;

    /// Memberships of a group, optionally filtered by status, oldest first.
    async fn list(
        &self,
        group_id: GroupId,
        status: Option<MemberStatus>,
    ) -> Result<Vec<Member>, MemberRepositoryError>;

    /// Overwrite the status of a membership.
    async fn set_status(
        &self,
        group_id: GroupId,
        user_id: UserId,
        status: MemberStatus,
    ) -> Result<(), MemberRepositoryError>;

    /// Number of approved memberships in a group.
    async fn count_approved(&self, group_id: GroupId) -> Result<u32, MemberRepositoryError>;

    /// Record a nomination; fails with `DuplicateNomination` when the same
    /// nominator already has a pending one for the nominee.
    async fn add_nomination(
        &self,
        nomination: &AdminNomination,
    ) -> Result<(), MemberRepositoryError>;

    /// Pending nominations for `nominee_id`.
    async fn pending_nominations(
        &self,
        group_id: GroupId,
        nominee_id: UserId,
    ) -> Result<Vec<AdminNomination>, MemberRepositoryError>;

    /// Make the nominee an admin and consume their pending nominations in
    /// one unit of work.
    async fn promote_to_admin(
        &self,
        group_id: GroupId,
        nominee_id: UserId,
    ) -> Result<(), MemberRepositoryError>;

    /// Store a new invitation; fails with `DuplicateInvitation` when the
    /// invitee already has a pending one for the group.
    async fn add_invitation(&self, invitation: &Invitation) -> Result<(), MemberRepositoryError>;

    /// Load an invitation by id.
    async fn find_invitation(
        &self,
        id: InvitationId,
    ) -> Result<Option<Invitation>, MemberRepositoryError>;

    /// Pending invitations addressed to `invitee_id`, newest first.
    async fn pending_invitations(
        &self,
        invitee_id: UserId,
    ) -> Result<Vec<Invitation>, MemberRepositoryError>;

    /// Mark a pending invitation accepted and insert `member` in one unit of
    /// work. Returns `false` when the invitation is no longer pending;
    /// fails with `DuplicateMember` when the invitee already has a record.
    async fn accept_invitation(
        &self,
        id: InvitationId,
        member: &Member,
    ) -> Result<bool, MemberRepositoryError>;

    /// Mark a pending invitation rejected; `false` when it is no longer
    /// pending.
    async fn reject_invitation(&self, id: InvitationId) -> Result<bool, MemberRepositoryError>;
}
