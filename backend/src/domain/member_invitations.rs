//! Admin invitations: issue, accept, reject and list.

use serde_json::json;
use tracing::info;

use super::MembershipService;
use crate::domain::access::{load_group, require_admin_or_creator};
use crate::domain::{
    EmailAddress, Error, GroupId, Invitation, InvitationId, InvitationStatus, Member, MemberRole,
    MemberStatus, Notification, NotificationKind, UserId,
};

fn already_processed(invitation: &Invitation) -> Error {
    Error::precondition_failed("invitation already processed")
        .with_details(json!({ "status": invitation.status.as_str() }))
}

impl MembershipService {
    /// Invite the user registered under `email` to the group.
    ///
    /// # Errors
    /// `Forbidden` for non-admins, `NotFound` for unknown groups or emails,
    /// `Conflict` when the user already has a membership record or a pending
    /// invitation.
    pub async fn invite(
        &self,
        group_id: GroupId,
        actor: UserId,
        email: EmailAddress,
    ) -> Result<Invitation, Error> {
        let group = load_group(self.groups.as_ref(), group_id).await?;
        require_admin_or_creator(self.members.as_ref(), group_id, actor).await?;
        let invitee = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| Error::not_found("no user is registered with this email"))?;
        if self.members.find(group_id, invitee.id).await?.is_some() {
            return Err(Error::conflict("user is already a member of this group"));
        }

        let invitation = Invitation::issue(group_id, actor, &invitee, self.clock.utc());
        self.members.add_invitation(&invitation).await?;

        let inviter = self
            .users
            .find(actor)
            .await?
            .map_or_else(|| "an admin".to_owned(), |user| user.display_name.as_ref().to_owned());
        self.notifier
            .send(Notification::new(
                invitee.id,
                group_id,
                NotificationKind::GroupInvitation,
                "Group invitation",
                format!("You have been invited to join {} by {inviter}", group.name),
            ))
            .await;
        info!(
            group_id = %group_id,
            invitation_id = %invitation.id,
            invitee_id = %invitee.id,
            "invitation issued"
        );
        Ok(invitation)
    }

    /// Open invitations addressed to `actor`, newest first. Expired ones are
    /// left out.
    ///
    /// # Errors
    /// Propagates repository failures.
    pub async fn list_invitations(&self, actor: UserId) -> Result<Vec<Invitation>, Error> {
        let now = self.clock.utc();
        Ok(self
            .members
            .pending_invitations(actor)
            .await?
            .into_iter()
            .filter(|invitation| !invitation.is_expired(now))
            .collect())
    }

    /// Accept an invitation, creating a pending membership for admins to
    /// review.
    ///
    /// # Errors
    /// `NotFound` unless the invitation is addressed to `actor`,
    /// `PreconditionFailed` when it was already answered, has expired or the
    /// group is full, `Conflict` when `actor` already has a membership.
    pub async fn accept_invitation(&self, id: InvitationId, actor: UserId) -> Result<Member, Error> {
        let invitation = self.invitation_for(id, actor).await?;
        if !invitation.is_pending() {
            return Err(already_processed(&invitation));
        }
        if invitation.is_expired(self.clock.utc()) {
            return Err(Error::precondition_failed("invitation has expired").with_details(
                json!({ "expiresAt": invitation.expires_at.to_rfc3339() }),
            ));
        }
        let group = load_group(self.groups.as_ref(), invitation.group_id).await?;
        let identity = self
            .users
            .find(actor)
            .await?
            .ok_or_else(|| Error::unauthorized("unknown user"))?;
        let approved = self.members.count_approved(group.id).await?;
        if approved >= group.max_members {
            return Err(Error::precondition_failed("group is full")
                .with_details(json!({ "maxMembers": group.max_members })));
        }

        let member = Member {
            group_id: group.id,
            user_id: actor,
            wallet: identity.wallet,
            role: MemberRole::Member,
            status: MemberStatus::Pending,
            joined_at: self.clock.utc(),
        };
        if !self.members.accept_invitation(id, &member).await? {
            return Err(Error::precondition_failed("invitation already processed"));
        }

        let admins: Vec<Member> = self
            .members
            .list(group.id, Some(MemberStatus::Approved))
            .await?
            .into_iter()
            .filter(Member::is_admin_or_creator)
            .collect();
        let message = format!(
            "{} has accepted an invitation and requests to join {}",
            identity.display_name.as_ref(),
            group.name
        );
        self.notifier
            .broadcast(
                &admins,
                None,
                group.id,
                NotificationKind::JoinRequest,
                "New member request",
                &message,
            )
            .await;
        info!(group_id = %group.id, invitation_id = %id, user_id = %actor, "invitation accepted");
        Ok(member)
    }

    /// Decline an invitation.
    ///
    /// # Errors
    /// `NotFound` unless the invitation is addressed to `actor`,
    /// `PreconditionFailed` when it was already answered.
    pub async fn reject_invitation(
        &self,
        id: InvitationId,
        actor: UserId,
    ) -> Result<Invitation, Error> {
        let invitation = self.invitation_for(id, actor).await?;
        if !invitation.is_pending() || !self.members.reject_invitation(id).await? {
            return Err(already_processed(&invitation));
        }
        info!(invitation_id = %id, user_id = %actor, "invitation rejected");
        Ok(Invitation {
            status: InvitationStatus::Rejected,
            ..invitation
        })
    }

    async fn invitation_for(&self, id: InvitationId, actor: UserId) -> Result<Invitation, Error> {
        self.members
            .find_invitation(id)
            .await?
            .filter(|invitation| invitation.invitee_id == actor)
            .ok_or_else(|| Error::not_found("invitation not found"))
    }
}

#[cfg(test)]
#[path = "member_invitations_tests.rs"]
mod tests;
