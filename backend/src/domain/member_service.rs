//! Membership registry: joins, invitations, reviews, status changes and admin
//! nomination.

use std::collections::HashSet;
use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::info;

use super::access::{load_group, require_admin_or_creator, require_approved_member};
use super::notifier::Notifier;
use super::ports::{GroupRepository, MemberRepository, ServicePorts, UserDirectory};
use super::{
    AdminNomination, Error, GroupId, Member, MemberRole, MemberStatus, NominationStatus,
    Notification, NotificationKind, UserId, WalletAddress,
};

/// Distinct nominations needed to promote a member to admin.
pub const ADMIN_PROMOTION_NOMINATIONS: usize = 2;

/// Admin decision on a pending join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberReview {
    /// Group being joined.
    pub group_id: GroupId,
    /// Admin making the decision.
    pub actor: UserId,
    /// Applicant.
    pub user_id: UserId,
    /// `true` approves, `false` rejects.
    pub approve: bool,
}

/// Result of casting an admin nomination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NominationOutcome {
    /// Pending nominations counted for the nominee, including this one.
    pub nominations: usize,
    /// Whether the nominee was promoted.
    pub promoted: bool,
}

/// Membership registry operations.
#[derive(Clone)]
pub struct MembershipService {
    groups: Arc<dyn GroupRepository>,
    members: Arc<dyn MemberRepository>,
    users: Arc<dyn UserDirectory>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl MembershipService {
    /// Build the service from the shared port bundle.
    #[must_use]
    pub fn new(ports: &ServicePorts) -> Self {
        Self {
            groups: Arc::clone(&ports.groups),
            members: Arc::clone(&ports.members),
            users: Arc::clone(&ports.users),
            notifier: Notifier::new(Arc::clone(&ports.notifications)),
            clock: Arc::clone(&ports.clock),
        }
    }

    /// Create a membership record.
    ///
    /// # Errors
    /// `Conflict` when `(group, user)` already has a record.
    pub async fn add_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
        wallet: WalletAddress,
        role: MemberRole,
        status: MemberStatus,
    ) -> Result<Member, Error> {
        let member = Member {
            group_id,
            user_id,
            wallet,
            role,
            status,
            joined_at: self.clock.utc(),
        };
        self.members.add(&member).await?;
        Ok(member)
    }

    /// Move a pending membership to approved or rejected.
    ///
    /// # Errors
    /// `NotFound` for unknown memberships, `PreconditionFailed` when the
    /// current status cannot move to `status`.
    pub async fn set_member_status(
        &self,
        group_id: GroupId,
        user_id: UserId,
        status: MemberStatus,
    ) -> Result<Member, Error> {
        let member = self
            .members
            .find(group_id, user_id)
            .await?
            .ok_or_else(|| Error::not_found("member not found"))?;
        if !member.status.can_transition_to(status) {
            return Err(Error::precondition_failed(format!(
                "membership is already {}",
                member.status
            ))
            .with_details(json!({ "status": member.status.as_str() })));
        }
        self.members.set_status(group_id, user_id, status).await?;
        Ok(Member { status, ..member })
    }

    /// Whether `user_id` is an admin or the creator of the group.
    ///
    /// # Errors
    /// Propagates repository failures.
    pub async fn is_admin_or_creator(&self, group_id: GroupId, user_id: UserId) -> Result<bool, Error> {
        let member = self.members.find(group_id, user_id).await?;
        Ok(member.is_some_and(|m| m.is_admin_or_creator()))
    }

    /// Number of approved members.
    ///
    /// # Errors
    /// Propagates repository failures.
    pub async fn approved_member_count(&self, group_id: GroupId) -> Result<u32, Error> {
        Ok(self.members.count_approved(group_id).await?)
    }

    /// Members of a group visible to an approved member.
    ///
    /// # Errors
    /// `NotFound` for unknown groups, `Forbidden` for non-members.
    pub async fn list_members(&self, group_id: GroupId, actor: UserId) -> Result<Vec<Member>, Error> {
        load_group(self.groups.as_ref(), group_id).await?;
        require_approved_member(self.members.as_ref(), group_id, actor).await?;
        Ok(self.members.list(group_id, None).await?)
    }

    /// Ask to join a group; admins are notified.
    ///
    /// # Errors
    /// `NotFound` for unknown groups, `Unauthorized` for unregistered users,
    /// `Conflict` for existing records, `PreconditionFailed` when full.
    pub async fn join_group(&self, group_id: GroupId, actor: UserId) -> Result<Member, Error> {
        let group = load_group(self.groups.as_ref(), group_id).await?;
        let identity = self
            .users
            .find(actor)
            .await?
            .ok_or_else(|| Error::unauthorized("unknown user"))?;

        if let Some(existing) = self.members.find(group_id, actor).await? {
            let message = match existing.status {
                MemberStatus::Pending => "join request already pending",
                MemberStatus::Approved => "already a member",
                MemberStatus::Rejected => "join request was rejected",
            };
            return Err(Error::conflict(message));
        }

        let approved = self.members.count_approved(group_id).await?;
        if approved >= group.max_members {
            return Err(Error::precondition_failed("group is full")
                .with_details(json!({ "maxMembers": group.max_members })));
        }

        let member = self
            .add_member(
                group_id,
                actor,
                identity.wallet,
                MemberRole::Member,
                MemberStatus::Pending,
            )
            .await?;

        let admins: Vec<Member> = self
            .members
            .list(group_id, Some(MemberStatus::Approved))
            .await?
            .into_iter()
            .filter(Member::is_admin_or_creator)
            .collect();
        let message = format!(
            "{} has requested to join {}",
            identity.display_name.as_ref(),
            group.name
        );
        self.notifier
            .broadcast(
                &admins,
                None,
                group_id,
                NotificationKind::JoinRequest,
                "New join request",
                &message,
            )
            .await;
        info!(group_id = %group_id, user_id = %actor, "join request recorded");
        Ok(member)
    }

    /// Approve or reject a pending join request.
    ///
    /// # Errors
    /// `Forbidden` for non-admins, `NotFound` for unknown applicants,
    /// `PreconditionFailed` for reviewed applicants or full groups.
    pub async fn review_member(&self, review: MemberReview) -> Result<Member, Error> {
        let group = load_group(self.groups.as_ref(), review.group_id).await?;
        require_admin_or_creator(self.members.as_ref(), review.group_id, review.actor).await?;

        let status = if review.approve {
            let approved = self.members.count_approved(review.group_id).await?;
            if approved >= group.max_members {
                return Err(Error::precondition_failed("group is full")
                    .with_details(json!({ "maxMembers": group.max_members })));
            }
            MemberStatus::Approved
        } else {
            MemberStatus::Rejected
        };
        let member = self
            .set_member_status(review.group_id, review.user_id, status)
            .await?;

        let (kind, title, message) = if review.approve {
            (
                NotificationKind::MembershipApproved,
                "Membership approved",
                format!("Your request to join {} was approved", group.name),
            )
        } else {
            (
                NotificationKind::MembershipRejected,
                "Membership rejected",
                format!("Your request to join {} was rejected", group.name),
            )
        };
        self.notifier
            .send(Notification::new(member.user_id, group.id, kind, title, message))
            .await;

        if review.approve && !group.is_approved {
            let approved = self.members.count_approved(review.group_id).await?;
            if approved == group.min_members {
                self.notifier
                    .send(Notification::new(
                        group.creator_id,
                        group.id,
                        NotificationKind::GroupReady,
                        "Group ready for approval",
                        format!(
                            "{} now has {approved} approved members and can be approved",
                            group.name
                        ),
                    ))
                    .await;
            }
        }
        Ok(member)
    }

    /// Nominate an approved member for admin; two distinct nominations
    /// promote them.
    ///
    /// # Errors
    /// `Forbidden` when the actor is not an approved member, `InvalidRequest`
    /// for self-nomination, `NotFound`/`PreconditionFailed` when the nominee
    /// is missing or unapproved, `Conflict` for admins or repeat nominations.
    pub async fn nominate_admin(
        &self,
        group_id: GroupId,
        actor: UserId,
        nominee_id: UserId,
    ) -> Result<NominationOutcome, Error> {
        let group = load_group(self.groups.as_ref(), group_id).await?;
        require_approved_member(self.members.as_ref(), group_id, actor).await?;
        if actor == nominee_id {
            return Err(Error::invalid_request("members cannot nominate themselves"));
        }
        let nominee = self
            .members
            .find(group_id, nominee_id)
            .await?
            .ok_or_else(|| Error::not_found("nominee is not a member of this group"))?;
        if !nominee.is_approved() {
            return Err(Error::precondition_failed("nominee is not an approved member"));
        }
        if nominee.is_admin_or_creator() {
            return Err(Error::conflict("member is already an admin"));
        }

        self.members
            .add_nomination(&AdminNomination {
                group_id,
                nominator_id: actor,
                nominee_id,
                status: NominationStatus::Pending,
                created_at: self.clock.utc(),
            })
            .await?;

        let nominators: HashSet<UserId> = self
            .members
            .pending_nominations(group_id, nominee_id)
            .await?
            .into_iter()
            .map(|nomination| nomination.nominator_id)
            .collect();
        let nominations = nominators.len();
        if nominations < ADMIN_PROMOTION_NOMINATIONS {
            return Ok(NominationOutcome {
                nominations,
                promoted: false,
            });
        }

        self.members.promote_to_admin(group_id, nominee_id).await?;
        info!(group_id = %group_id, user_id = %nominee_id, "member promoted to admin");
        self.notifier
            .send(Notification::new(
                nominee_id,
                group_id,
                NotificationKind::AdminPromotion,
                "Promoted to admin",
                format!("You are now an admin of {}", group.name),
            ))
            .await;
        Ok(NominationOutcome {
            nominations,
            promoted: true,
        })
    }
}

#[path = "member_invitations.rs"]
mod invitations;

#[cfg(test)]
#[path = "member_service_tests.rs"]
mod tests;
