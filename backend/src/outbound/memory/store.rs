//! Single-lock in-memory implementation of the repository ports.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;

use crate::domain::ports::{
    GroupActivation, GroupRepository, GroupRepositoryError, LedgerGateway, MemberRepository,
    MemberRepositoryError, NotificationInbox, NotificationSink, PayoutCompletion, PayoutRepository,
    PayoutRepositoryError, RoundLedgerRepository, RoundLedgerRepositoryError, ServicePorts,
    UserDirectory, UserDirectoryError,
};
use crate::domain::{
    AdminNomination, ContributionStatus, EmailAddress, Group, GroupId, GroupStatus, Invitation,
    InvitationId, InvitationStatus, Member, MemberRole, MemberStatus, Money, NominationStatus,
    PayoutApproval, PayoutFlags, PayoutRequest, PayoutRequestId, PayoutScheduleEntry,
    PayoutStatus, RoundContribution, RoundPhase, RoundStatus, RoundStatusInput, ScheduleStatus,
    UserId, UserIdentity, VoteTally,
};

#[derive(Debug, Default)]
struct StoreState {
    users: BTreeMap<UserId, UserIdentity>,
    groups: BTreeMap<GroupId, Group>,
    members: Vec<Member>,
    nominations: Vec<AdminNomination>,
    invitations: Vec<Invitation>,
    contributions: Vec<RoundContribution>,
    round_statuses: BTreeMap<(GroupId, u32), RoundStatus>,
    payouts: Vec<PayoutRequest>,
    schedules: BTreeMap<(GroupId, u32), PayoutScheduleEntry>,
}

impl StoreState {
    fn member_mut(&mut self, group_id: GroupId, user_id: UserId) -> Option<&mut Member> {
        self.members
            .iter_mut()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
    }

    fn approved_count(&self, group_id: GroupId) -> u32 {
        let count = self
            .members
            .iter()
            .filter(|m| m.group_id == group_id && m.status == MemberStatus::Approved)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn pending_invitation_mut(&mut self, id: InvitationId) -> Option<&mut Invitation> {
        self.invitations
            .iter_mut()
            .find(|invitation| invitation.id == id && invitation.is_pending())
    }

    fn payout_mut(&mut self, id: PayoutRequestId) -> Option<&mut PayoutRequest> {
        self.payouts.iter_mut().find(|request| request.id == id)
    }

    fn recompute(
        &mut self,
        group_id: GroupId,
        round: u32,
        contribution_amount: Money,
    ) -> Result<RoundStatus, RoundLedgerRepositoryError> {
        let flags = self
            .round_statuses
            .get(&(group_id, round))
            .map_or_else(PayoutFlags::default, RoundStatus::flags);
        let status = RoundStatus::recompute(
            RoundStatusInput {
                group_id,
                round,
                contribution_amount,
                required_count: self.approved_count(group_id),
                flags,
            },
            &self.contributions,
        )
        .map_err(|err| RoundLedgerRepositoryError::query(err.to_string()))?;
        self.round_statuses.insert((group_id, round), status.clone());
        Ok(status)
    }
}

/// In-memory implementation of every repository port and the user directory.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle the store with the remaining collaborators. `notifications`
    /// serves as both the sink and the inbox.
    #[must_use]
    pub fn service_ports<N>(
        &self,
        ledger: Arc<dyn LedgerGateway>,
        notifications: Arc<N>,
        clock: Arc<dyn Clock>,
    ) -> ServicePorts
    where
        N: NotificationSink + NotificationInbox + 'static,
    {
        ServicePorts {
            groups: Arc::new(self.clone()),
            members: Arc::new(self.clone()),
            rounds: Arc::new(self.clone()),
            payouts: Arc::new(self.clone()),
            users: Arc::new(self.clone()),
            ledger,
            notifications: Arc::clone(&notifications) as Arc<dyn NotificationSink>,
            inbox: notifications,
            clock,
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn register(&self, identity: &UserIdentity) -> Result<(), UserDirectoryError> {
        let mut state = self.state();
        if state.users.values().any(|user| user.email == identity.email) {
            return Err(UserDirectoryError::duplicate_email());
        }
        state.users.insert(identity.id, identity.clone());
        Ok(())
    }

    async fn find(&self, id: UserId) -> Result<Option<UserIdentity>, UserDirectoryError> {
        Ok(self.state().users.get(&id).cloned())
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserIdentity>, UserDirectoryError> {
        Ok(self
            .state()
            .users
            .values()
            .find(|user| &user.email == email)
            .cloned())
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn create(&self, group: &Group, creator: &Member) -> Result<(), GroupRepositoryError> {
        let mut state = self.state();
        if state.groups.contains_key(&group.id) {
            return Err(GroupRepositoryError::query("group id already exists"));
        }
        state.groups.insert(group.id, group.clone());
        state.members.push(creator.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: GroupId) -> Result<Option<Group>, GroupRepositoryError> {
        Ok(self.state().groups.get(&id).cloned())
    }

    async fn mark_approved(&self, id: GroupId) -> Result<(), GroupRepositoryError> {
        if let Some(group) = self.state().groups.get_mut(&id) {
            group.is_approved = true;
        }
        Ok(())
    }

    async fn activate(&self, activation: &GroupActivation) -> Result<(), GroupRepositoryError> {
        let mut state = self.state();
        let group = state
            .groups
            .get_mut(&activation.group_id)
            .filter(|group| group.status == GroupStatus::Pending && group.is_approved)
            .ok_or_else(|| GroupRepositoryError::stale_state("group is no longer pending"))?;
        group.status = GroupStatus::Active;
        group.terms = Some(activation.terms.clone());
        group.current_round = 1;
        group.next_contribution_date = Some(activation.next_contribution_date);
        for entry in &activation.schedule {
            state
                .schedules
                .insert((entry.group_id, entry.round), entry.clone());
        }
        Ok(())
    }

    async fn payout_schedule(
        &self,
        id: GroupId,
    ) -> Result<Vec<PayoutScheduleEntry>, GroupRepositoryError> {
        Ok(self
            .state()
            .schedules
            .range((id, 0)..=(id, u32::MAX))
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn list_due_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Group>, GroupRepositoryError> {
        let mut due: Vec<Group> = self
            .state()
            .groups
            .values()
            .filter(|group| group.status == GroupStatus::Active)
            .filter(|group| group.next_contribution_date.is_some_and(|date| date <= cutoff))
            .cloned()
            .collect();
        due.sort_by_key(|group| group.next_contribution_date);
        Ok(due)
    }
}

#[async_trait]
impl MemberRepository for MemoryStore {
    async fn add(&self, member: &Member) -> Result<(), MemberRepositoryError> {
        let mut state = self.state();
        if state.member_mut(member.group_id, member.user_id).is_some() {
            return Err(MemberRepositoryError::duplicate_member());
        }
        state.members.push(member.clone());
        Ok(())
    }

    async fn find(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<Option<Member>, MemberRepositoryError> {
        Ok(self.state().member_mut(group_id, user_id).cloned())
    }

    async fn list(
        &self,
        group_id: GroupId,
        status: Option<MemberStatus>,
    ) -> Result<Vec<Member>, MemberRepositoryError> {
        let mut members: Vec<Member> = self
            .state()
            .members
            .iter()
            .filter(|m| m.group_id == group_id)
            .filter(|m| status.is_none_or(|wanted| m.status == wanted))
            .cloned()
            .collect();
        members.sort_by_key(|m| m.joined_at);
        Ok(members)
    }

    async fn set_status(
        &self,
        group_id: GroupId,
        user_id: UserId,
        status: MemberStatus,
    ) -> Result<(), MemberRepositoryError> {
        let mut state = self.state();
        let member = state
            .member_mut(group_id, user_id)
            .ok_or_else(MemberRepositoryError::missing_member)?;
        member.status = status;
        Ok(())
    }

    async fn count_approved(&self, group_id: GroupId) -> Result<u32, MemberRepositoryError> {
        Ok(self.state().approved_count(group_id))
    }

    async fn add_nomination(
        &self,
        nomination: &AdminNomination,
    ) -> Result<(), MemberRepositoryError> {
        let mut state = self.state();
        let duplicate = state.nominations.iter().any(|n| {
            n.group_id == nomination.group_id
                && n.nominator_id == nomination.nominator_id
                && n.nominee_id == nomination.nominee_id
                && n.status == NominationStatus::Pending
        });
        if duplicate {
            return Err(MemberRepositoryError::duplicate_nomination());
        }
        state.nominations.push(nomination.clone());
        Ok(())
    }

    async fn pending_nominations(
        &self,
        group_id: GroupId,
        nominee_id: UserId,
    ) -> Result<Vec<AdminNomination>, MemberRepositoryError> {
        Ok(self
            .state()
            .nominations
            .iter()
            .filter(|n| {
                n.group_id == group_id
                    && n.nominee_id == nominee_id
                    && n.status == NominationStatus::Pending
            })
            .cloned()
            .collect())
    }

    async fn promote_to_admin(
        &self,
        group_id: GroupId,
        nominee_id: UserId,
    ) -> Result<(), MemberRepositoryError> {
        let mut state = self.state();
        let member = state
            .member_mut(group_id, nominee_id)
            .ok_or_else(MemberRepositoryError::missing_member)?;
        member.role = MemberRole::Admin;
        for nomination in state
            .nominations
            .iter_mut()
            .filter(|n| n.group_id == group_id && n.nominee_id == nominee_id)
        {
            nomination.status = NominationStatus::Approved;
        }
        Ok(())
    }

    async fn add_invitation(&self, invitation: &Invitation) -> Result<(), MemberRepositoryError> {
        let mut state = self.state();
        let duplicate = state.invitations.iter().any(|existing| {
            existing.group_id == invitation.group_id
                && existing.invitee_id == invitation.invitee_id
                && existing.is_pending()
        });
        if duplicate {
            return Err(MemberRepositoryError::duplicate_invitation());
        }
        state.invitations.push(invitation.clone());
        Ok(())
    }

    async fn find_invitation(
        &self,
        id: InvitationId,
    ) -> Result<Option<Invitation>, MemberRepositoryError> {
        Ok(self
            .state()
            .invitations
            .iter()
            .find(|invitation| invitation.id == id)
            .cloned())
    }

    async fn pending_invitations(
        &self,
        invitee_id: UserId,
    ) -> Result<Vec<Invitation>, MemberRepositoryError> {
        let mut invitations: Vec<Invitation> = self
            .state()
            .invitations
            .iter()
            .filter(|invitation| invitation.invitee_id == invitee_id && invitation.is_pending())
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    async fn accept_invitation(
        &self,
        id: InvitationId,
        member: &Member,
    ) -> Result<bool, MemberRepositoryError> {
        let mut state = self.state();
        if state.pending_invitation_mut(id).is_none() {
            return Ok(false);
        }
        if state.member_mut(member.group_id, member.user_id).is_some() {
            return Err(MemberRepositoryError::duplicate_member());
        }
        if let Some(invitation) = state.pending_invitation_mut(id) {
            invitation.status = InvitationStatus::Accepted;
        }
        state.members.push(member.clone());
        Ok(true)
    }

    async fn reject_invitation(&self, id: InvitationId) -> Result<bool, MemberRepositoryError> {
        let mut state = self.state();
        let Some(invitation) = state.pending_invitation_mut(id) else {
            return Ok(false);
        };
        invitation.status = InvitationStatus::Rejected;
        Ok(true)
    }
}

#[async_trait]
impl RoundLedgerRepository for MemoryStore {
    async fn find_confirmed(
        &self,
        group_id: GroupId,
        user_id: UserId,
        round: u32,
    ) -> Result<Option<RoundContribution>, RoundLedgerRepositoryError> {
        Ok(self
            .state()
            .contributions
            .iter()
            .find(|c| {
                c.group_id == group_id
                    && c.user_id == user_id
                    && c.round == round
                    && c.status == ContributionStatus::Confirmed
            })
            .cloned())
    }

    async fn record_contribution(
        &self,
        contribution: &RoundContribution,
        contribution_amount: Money,
    ) -> Result<RoundStatus, RoundLedgerRepositoryError> {
        let mut state = self.state();
        let duplicate = contribution.status == ContributionStatus::Confirmed
            && state.contributions.iter().any(|c| {
                c.group_id == contribution.group_id
                    && c.user_id == contribution.user_id
                    && c.round == contribution.round
                    && c.status == ContributionStatus::Confirmed
            });
        if duplicate {
            return Err(RoundLedgerRepositoryError::duplicate_contribution());
        }
        state.contributions.push(contribution.clone());
        state.recompute(contribution.group_id, contribution.round, contribution_amount)
    }

    async fn contributions(
        &self,
        group_id: GroupId,
        round: u32,
    ) -> Result<Vec<RoundContribution>, RoundLedgerRepositoryError> {
        Ok(self
            .state()
            .contributions
            .iter()
            .filter(|c| c.group_id == group_id && c.round == round)
            .cloned()
            .collect())
    }

    async fn round_status(
        &self,
        group_id: GroupId,
        round: u32,
    ) -> Result<Option<RoundStatus>, RoundLedgerRepositoryError> {
        Ok(self.state().round_statuses.get(&(group_id, round)).cloned())
    }

    async fn rebuild_status(
        &self,
        group_id: GroupId,
        round: u32,
        contribution_amount: Money,
        _updated_at: DateTime<Utc>,
    ) -> Result<RoundStatus, RoundLedgerRepositoryError> {
        self.state().recompute(group_id, round, contribution_amount)
    }

    async fn authorize_payout(
        &self,
        group_id: GroupId,
        round: u32,
        _updated_at: DateTime<Utc>,
    ) -> Result<Option<RoundStatus>, RoundLedgerRepositoryError> {
        let mut state = self.state();
        Ok(state.round_statuses.get_mut(&(group_id, round)).map(|status| {
            status.payout_authorized = true;
            status.clone()
        }))
    }
}

#[async_trait]
impl PayoutRepository for MemoryStore {
    async fn create(&self, request: &PayoutRequest) -> Result<(), PayoutRepositoryError> {
        let mut state = self.state();
        let outstanding = state.payouts.iter().any(|existing| {
            existing.group_id == request.group_id
                && existing.round == request.round
                && existing.status.is_outstanding()
        });
        if outstanding {
            return Err(PayoutRepositoryError::outstanding_request());
        }
        state.payouts.push(request.clone());
        Ok(())
    }

    async fn find(
        &self,
        id: PayoutRequestId,
    ) -> Result<Option<PayoutRequest>, PayoutRepositoryError> {
        Ok(self.state().payout_mut(id).cloned())
    }

    async fn list_for_group(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<PayoutRequest>, PayoutRepositoryError> {
        let mut requests: Vec<PayoutRequest> = self
            .state()
            .payouts
            .iter()
            .filter(|request| request.group_id == group_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn record_vote(&self, vote: &PayoutApproval) -> Result<VoteTally, PayoutRepositoryError> {
        let mut state = self.state();
        let request = state
            .payout_mut(vote.request_id)
            .ok_or_else(|| PayoutRepositoryError::query("payout request not found"))?;
        if request.status != PayoutStatus::Pending {
            return Err(PayoutRepositoryError::not_pending(request.status.as_str()));
        }
        if request.has_vote_from(vote.admin_id) {
            return Err(PayoutRepositoryError::already_voted());
        }
        request.approvals.push(vote.clone());
        Ok(request.tally())
    }

    async fn transition(
        &self,
        id: PayoutRequestId,
        from: PayoutStatus,
        to: PayoutStatus,
    ) -> Result<bool, PayoutRepositoryError> {
        let mut state = self.state();
        match state.payout_mut(id) {
            Some(request) if request.status == from => {
                request.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(&self, completion: &PayoutCompletion) -> Result<bool, PayoutRepositoryError> {
        let mut state = self.state();
        let Some(request) = state.payout_mut(completion.request_id).filter(|request| {
            request.status == PayoutStatus::Approved
                && request.idempotency_token == completion.idempotency_token
        }) else {
            return Ok(false);
        };
        request.status = PayoutStatus::Completed;
        request.tx_hash = Some(completion.tx_hash.clone());

        let advance = &completion.advance;
        if let Some(group) = state
            .groups
            .get_mut(&advance.group_id)
            .filter(|group| group.current_round == advance.completed_round)
        {
            group.current_round = advance.next_round;
            group.next_contribution_date = advance.next_contribution_date;
            group.status = advance.status;
        }
        if let Some(entry) = state.schedules.get_mut(&(advance.group_id, completion.round)) {
            entry.status = ScheduleStatus::Paid;
            entry.paid_at = Some(completion.completed_at);
            entry.tx_hash = Some(completion.tx_hash.clone());
        }
        if let Some(status) = state
            .round_statuses
            .get_mut(&(advance.group_id, completion.round))
        {
            status.status = RoundPhase::Completed;
        }
        Ok(true)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
