//! Group lifecycle: creation, approval, activation and the payout schedule.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::info;

use super::access::{approved_members, load_group, require_admin_or_creator, require_approved_member};
use super::group::add_days;
use super::notifier::Notifier;
use super::ports::{GroupActivation, GroupRepository, MemberRepository, ServicePorts, UserDirectory};
use super::{
    ContributionTerms, Error, Group, GroupDraft, GroupId, GroupStatus, Member, MemberRole,
    MemberStatus, Money, NotificationKind, PayoutScheduleEntry, UserId, WalletAddress,
};

/// Input for [`GroupLifecycleService::create_group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGroupRequest {
    /// Creating user.
    pub actor: UserId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Custodial wallet of the group.
    pub wallet: WalletAddress,
    /// Minimum approved members; defaults when absent.
    pub min_members: Option<u32>,
    /// Maximum approved members; defaults when absent.
    pub max_members: Option<u32>,
}

/// Input for [`GroupLifecycleService::activate_group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateGroupRequest {
    /// Group to activate.
    pub group_id: GroupId,
    /// Admin activating the group.
    pub actor: UserId,
    /// Fixed per-round contribution.
    pub contribution_amount: Money,
    /// Days between contributions.
    pub period_days: u32,
    /// Rotation order of recipients.
    pub payout_order: Vec<UserId>,
}

/// Group lifecycle operations.
#[derive(Clone)]
pub struct GroupLifecycleService {
    groups: Arc<dyn GroupRepository>,
    members: Arc<dyn MemberRepository>,
    users: Arc<dyn UserDirectory>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl GroupLifecycleService {
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

    /// Create a pending group with the actor as approved creator.
    ///
    /// # Errors
    /// `InvalidRequest` for invalid input, `Unauthorized` for unregistered
    /// users.
    pub async fn create_group(&self, request: CreateGroupRequest) -> Result<Group, Error> {
        let CreateGroupRequest {
            actor,
            name,
            description,
            wallet,
            min_members,
            max_members,
        } = request;
        let draft = GroupDraft::new(&name, &description, wallet, min_members, max_members)?;
        let identity = self
            .users
            .find(actor)
            .await?
            .ok_or_else(|| Error::unauthorized("unknown user"))?;

        let now = self.clock.utc();
        let group = Group::create(GroupId::random(), actor, draft, now);
        let creator = Member {
            group_id: group.id,
            user_id: actor,
            wallet: identity.wallet,
            role: MemberRole::Creator,
            status: MemberStatus::Approved,
            joined_at: now,
        };
        self.groups.create(&group, &creator).await?;
        info!(group_id = %group.id, creator_id = %actor, "group created");
        Ok(group)
    }

    /// Load a group.
    ///
    /// # Errors
    /// `NotFound` for unknown groups.
    pub async fn get_group(&self, group_id: GroupId) -> Result<Group, Error> {
        load_group(self.groups.as_ref(), group_id).await
    }

    /// Approve the roster once it reaches the minimum size.
    ///
    /// # Errors
    /// `Forbidden` unless the actor is the creator, `Conflict` when already
    /// approved, `PreconditionFailed` with too few approved members.
    pub async fn approve_group(&self, group_id: GroupId, actor: UserId) -> Result<Group, Error> {
        let group = load_group(self.groups.as_ref(), group_id).await?;
        if group.creator_id != actor {
            return Err(Error::forbidden("only the group creator can approve the group"));
        }
        if group.is_approved {
            return Err(Error::conflict("group is already approved"));
        }
        let approved = self.members.count_approved(group_id).await?;
        if approved < group.min_members {
            return Err(Error::precondition_failed("insufficient members to approve the group")
                .with_details(json!({ "approved": approved, "required": group.min_members })));
        }

        self.groups.mark_approved(group_id).await?;
        let members = approved_members(self.members.as_ref(), group_id).await?;
        self.notifier
            .broadcast(
                &members,
                None,
                group_id,
                NotificationKind::GroupApproved,
                "Group approved",
                &format!("{} has been approved and can now be activated", group.name),
            )
            .await;
        info!(group_id = %group_id, approved, "group approved");
        Ok(Group {
            is_approved: true,
            ..group
        })
    }

    /// Fix contribution terms, start round 1 and write the payout schedule.
    ///
    /// # Errors
    /// `Forbidden` for non-admins, `PreconditionFailed` when the group is not
    /// approved or not pending, `InvalidRequest` for invalid terms.
    pub async fn activate_group(&self, request: ActivateGroupRequest) -> Result<Group, Error> {
        let ActivateGroupRequest {
            group_id,
            actor,
            contribution_amount,
            period_days,
            payout_order,
        } = request;
        let group = load_group(self.groups.as_ref(), group_id).await?;
        require_admin_or_creator(self.members.as_ref(), group_id, actor).await?;
        if !group.is_approved {
            return Err(Error::precondition_failed("group has not been approved"));
        }
        if group.status != GroupStatus::Pending {
            return Err(Error::precondition_failed(format!("group is already {}", group.status))
                .with_details(json!({ "status": group.status.as_str() })));
        }

        let members = approved_members(self.members.as_ref(), group_id).await?;
        let terms = ContributionTerms::new(contribution_amount, period_days, payout_order, &members)?;
        let member_count = terms.rotation_length();
        let now = self.clock.utc();
        let next_contribution_date = add_days(now, period_days)?;
        let schedule = terms.schedule(group_id, now, member_count)?;

        self.groups
            .activate(&GroupActivation {
                group_id,
                terms: terms.clone(),
                next_contribution_date,
                schedule,
            })
            .await?;

        self.notifier
            .broadcast(
                &members,
                None,
                group_id,
                NotificationKind::GroupActivated,
                "Group activated",
                &format!(
                    "{} is active: contribute {} every {period_days} days",
                    group.name, terms.contribution_amount
                ),
            )
            .await;
        info!(group_id = %group_id, members = member_count, "group activated");
        Ok(Group {
            status: GroupStatus::Active,
            terms: Some(terms),
            current_round: 1,
            next_contribution_date: Some(next_contribution_date),
            ..group
        })
    }

    /// Rotation schedule, ordered by round.
    ///
    /// # Errors
    /// `NotFound` for unknown groups, `Forbidden` for non-members.
    pub async fn payout_schedule(
        &self,
        group_id: GroupId,
        actor: UserId,
    ) -> Result<Vec<PayoutScheduleEntry>, Error> {
        load_group(self.groups.as_ref(), group_id).await?;
        require_approved_member(self.members.as_ref(), group_id, actor).await?;
        let mut schedule = self.groups.payout_schedule(group_id).await?;
        schedule.sort_by_key(|entry| entry.round);
        Ok(schedule)
    }
}

#[cfg(test)]
#[path = "group_service_tests.rs"]
mod tests;
