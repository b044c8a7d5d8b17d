//! Payout engine: request creation, admin voting and transfer execution.
//!
//! A request moves `pending -> approved -> completed`, `pending -> rejected`
//! or `approved -> failed`. Reaching `approved` triggers the transfer in the
//! same call; completion is recorded atomically against the request's
//! idempotency token together with the group's round advance.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::access::{approved_members, load_group, require_admin_or_creator, require_approved_member};
use super::notifier::Notifier;
use super::ports::{
    GroupRepository, LedgerGateway, MemberRepository, PayoutCompletion, PayoutRepository,
    ServicePorts,
};
use super::{
    ApprovalPolicy, Error, Group, GroupId, Member, Money, NotificationKind, PayoutApproval,
    PayoutRequest, PayoutRequestId, PayoutStatus, TransferRequest, TransferSource, UserId,
    VoteOutcome, VoteTally,
};

/// Input for [`PayoutEngine::create_payout_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatePayoutRequest {
    /// Paying group.
    pub group_id: GroupId,
    /// Admin proposing the payout.
    pub actor: UserId,
    /// Member to be paid.
    pub recipient_id: UserId,
    /// Amount to transfer.
    pub amount: Money,
    /// Round the payout settles.
    pub round: u32,
}

/// Result of a vote, including the request after any transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteReceipt {
    /// Request as stored after the vote.
    pub request: PayoutRequest,
    /// Decision reached by the tally.
    pub outcome: VoteOutcome,
    /// Votes counted so far.
    pub tally: VoteTally,
}

/// Payout request lifecycle.
#[derive(Clone)]
pub struct PayoutEngine {
    groups: Arc<dyn GroupRepository>,
    members: Arc<dyn MemberRepository>,
    payouts: Arc<dyn PayoutRepository>,
    ledger: Arc<dyn LedgerGateway>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    policy: ApprovalPolicy,
}

impl PayoutEngine {
    /// Build the engine with the given approval policy.
    #[must_use]
    pub fn new(ports: &ServicePorts, policy: ApprovalPolicy) -> Self {
        Self {
            groups: Arc::clone(&ports.groups),
            members: Arc::clone(&ports.members),
            payouts: Arc::clone(&ports.payouts),
            ledger: Arc::clone(&ports.ledger),
            notifier: Notifier::new(Arc::clone(&ports.notifications)),
            clock: Arc::clone(&ports.clock),
            policy,
        }
    }

    /// Approval policy applied to tallies.
    #[must_use]
    pub const fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    /// Propose a payout for the group's current round.
    ///
    /// The group wallet balance is checked when the ledger answers; a ledger
    /// error only logs a warning.
    ///
    /// # Errors
    /// `InvalidRequest` for a non-positive amount, round zero or an
    /// unapproved recipient; `Forbidden` for non-admins;
    /// `PreconditionFailed` for inactive groups, a round other than the
    /// current one or an insufficient balance; `Conflict` when a pending or
    /// approved request already exists for the round.
    pub async fn create_payout_request(
        &self,
        request: CreatePayoutRequest,
    ) -> Result<PayoutRequest, Error> {
        if !request.amount.is_positive() {
            return Err(Error::invalid_request("amount must be positive"));
        }
        if request.round == 0 {
            return Err(Error::invalid_request("round must be at least 1"));
        }
        let group = load_group(self.groups.as_ref(), request.group_id).await?;
        group.active_terms()?;
        require_admin_or_creator(self.members.as_ref(), group.id, request.actor).await?;
        match self.members.find(group.id, request.recipient_id).await? {
            Some(member) if member.is_approved() => {}
            _ => {
                return Err(Error::invalid_request(
                    "recipient is not an approved member of this group",
                ));
            }
        }
        if request.round != group.current_round {
            return Err(Error::precondition_failed(format!(
                "payouts are open for round {} only",
                group.current_round
            ))
            .with_details(json!({
                "currentRound": group.current_round,
                "requestedRound": request.round,
            })));
        }
        self.check_balance(&group, request.amount).await?;

        let payout = PayoutRequest {
            id: PayoutRequestId::random(),
            group_id: group.id,
            recipient_id: request.recipient_id,
            amount: request.amount,
            round: request.round,
            status: PayoutStatus::Pending,
            idempotency_token: Uuid::new_v4(),
            tx_hash: None,
            created_by: request.actor,
            created_at: self.clock.utc(),
            approvals: Vec::new(),
        };
        self.payouts.create(&payout).await?;
        info!(
            request_id = %payout.id,
            group_id = %group.id,
            round = payout.round,
            amount = %payout.amount,
            "payout request created"
        );

        let admins = self.admins(group.id).await?;
        self.notifier
            .broadcast(
                &admins,
                Some(request.actor),
                group.id,
                NotificationKind::PayoutRequest,
                "Payout approval needed",
                &format!(
                    "A payout of {} for round {} of {} awaits your vote",
                    payout.amount, payout.round, group.name
                ),
            )
            .await;
        Ok(payout)
    }

    async fn check_balance(&self, group: &Group, amount: Money) -> Result<(), Error> {
        match self.ledger.balance(&group.wallet).await {
            Ok(balance) if balance < amount => Err(Error::precondition_failed(
                "group wallet balance is insufficient",
            )
            .with_details(json!({ "balance": balance, "requested": amount }))),
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(error = %err, group_id = %group.id, "balance check skipped");
                Ok(())
            }
        }
    }

    /// Record an admin's vote and apply the resulting transition.
    ///
    /// A single rejection kills the request; reaching the approval threshold
    /// executes the transfer immediately.
    ///
    /// # Errors
    /// `NotFound` for unknown requests, `PreconditionFailed` once the request
    /// has left `pending`, `Forbidden` for non-admins, `Conflict` for repeat
    /// votes and `ExternalFailure` when execution fails.
    pub async fn record_vote(
        &self,
        request_id: PayoutRequestId,
        actor: UserId,
        approve: bool,
    ) -> Result<VoteReceipt, Error> {
        let request = self.find_request(request_id).await?;
        if request.status != PayoutStatus::Pending {
            return Err(Error::precondition_failed(format!(
                "payout request is already {}",
                request.status
            )));
        }
        require_admin_or_creator(self.members.as_ref(), request.group_id, actor).await?;
        if request.has_vote_from(actor) {
            return Err(Error::conflict("vote already recorded for this admin"));
        }

        let vote = PayoutApproval {
            request_id,
            admin_id: actor,
            approved: approve,
            voted_at: self.clock.utc(),
        };
        let tally = self.payouts.record_vote(&vote).await?;
        let outcome = self.policy.decide(tally);
        info!(
            request_id = %request_id,
            admin_id = %actor,
            approve,
            approvals = tally.approvals,
            rejections = tally.rejections,
            "payout vote recorded"
        );

        match outcome {
            VoteOutcome::StillPending => {}
            VoteOutcome::Rejected => {
                if self
                    .payouts
                    .transition(request_id, PayoutStatus::Pending, PayoutStatus::Rejected)
                    .await?
                {
                    info!(request_id = %request_id, "payout request rejected");
                }
            }
            VoteOutcome::Approved => {
                if self
                    .payouts
                    .transition(request_id, PayoutStatus::Pending, PayoutStatus::Approved)
                    .await?
                {
                    self.execute(request_id).await?;
                }
            }
        }

        let request = self.find_request(request_id).await?;
        Ok(VoteReceipt {
            request,
            outcome,
            tally,
        })
    }

    async fn execute(&self, request_id: PayoutRequestId) -> Result<(), Error> {
        let request = self.find_request(request_id).await?;
        let group = load_group(self.groups.as_ref(), request.group_id).await?;
        let recipient = self
            .members
            .find(group.id, request.recipient_id)
            .await?
            .ok_or_else(|| Error::not_found("payout recipient is no longer a member"))?;

        // The advance must be known before funds move.
        let advance = match group.advance_after_payout() {
            Ok(advance) => advance,
            Err(err) => {
                warn!(error = %err, request_id = %request_id, "payout cannot advance the group");
                self.mark_failed(&request, &group).await?;
                return Err(err);
            }
        };

        let transfer = TransferRequest {
            source: TransferSource::Custodial {
                wallet: group.wallet.clone(),
            },
            destination: recipient.wallet.clone(),
            amount: request.amount,
            idempotency_token: request.idempotency_token,
        };
        let tx_hash = match self.ledger.transfer(&transfer).await {
            Ok(hash) => hash,
            Err(err) => {
                warn!(error = %err, request_id = %request_id, "payout transfer failed");
                self.mark_failed(&request, &group).await?;
                return Err(Error::from(err));
            }
        };

        let completion = PayoutCompletion {
            request_id,
            idempotency_token: request.idempotency_token,
            tx_hash: tx_hash.clone(),
            completed_at: self.clock.utc(),
            round: request.round,
            advance,
        };
        match self.payouts.complete(&completion).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(request_id = %request_id, tx_hash = %tx_hash, "payout completion already recorded");
                return Ok(());
            }
            Err(err) => {
                error!(
                    error = %err,
                    request_id = %request_id,
                    tx_hash = %tx_hash,
                    "transfer settled but completion was not recorded"
                );
                return Err(err.into());
            }
        }
        info!(
            request_id = %request_id,
            group_id = %group.id,
            round = request.round,
            tx_hash = %tx_hash,
            "payout completed"
        );

        let members = approved_members(self.members.as_ref(), group.id).await?;
        self.notifier
            .broadcast(
                &members,
                None,
                group.id,
                NotificationKind::PayoutCompleted,
                "Payout completed",
                &format!(
                    "{} was paid out for round {} of {}",
                    request.amount, request.round, group.name
                ),
            )
            .await;
        Ok(())
    }

    async fn mark_failed(&self, request: &PayoutRequest, group: &Group) -> Result<(), Error> {
        self.payouts
            .transition(request.id, PayoutStatus::Approved, PayoutStatus::Failed)
            .await?;
        self.notifier
            .broadcast(
                &self.admins(group.id).await?,
                None,
                group.id,
                NotificationKind::PayoutFailed,
                "Payout failed",
                &format!(
                    "The payout for round {} of {} failed; create a new request to retry",
                    request.round, group.name
                ),
            )
            .await;
        Ok(())
    }

    async fn admins(&self, group_id: GroupId) -> Result<Vec<Member>, Error> {
        Ok(approved_members(self.members.as_ref(), group_id)
            .await?
            .into_iter()
            .filter(|m| m.is_admin_or_creator())
            .collect())
    }

    async fn find_request(&self, request_id: PayoutRequestId) -> Result<PayoutRequest, Error> {
        self.payouts
            .find(request_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("payout request {request_id} not found")))
    }

    /// Requests for the group, newest first, with their votes.
    ///
    /// # Errors
    /// `NotFound` for unknown groups and `Forbidden` for non-members.
    pub async fn list_payout_requests(
        &self,
        group_id: GroupId,
        actor: UserId,
    ) -> Result<Vec<PayoutRequest>, Error> {
        load_group(self.groups.as_ref(), group_id).await?;
        require_approved_member(self.members.as_ref(), group_id, actor).await?;
        Ok(self.payouts.list_for_group(group_id).await?)
    }
}

#[cfg(test)]
#[path = "payout_service_tests.rs"]
mod tests;
