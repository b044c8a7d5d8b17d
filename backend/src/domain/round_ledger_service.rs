//! Round ledger: contributions, round status and round payout authorisation.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::access::{approved_members, load_group, require_admin_or_creator, require_approved_member};
use super::notifier::Notifier;
use super::ports::{
    GroupRepository, LedgerGateway, MemberRepository, RoundLedgerRepository,
    RoundLedgerRepositoryError, ServicePorts,
};
use super::{
    ContributionId, ContributionStatus, Error, Group, GroupId, Member, Money, NotificationKind,
    PayoutFlags, RoundContribution, RoundReport, RoundStatus, RoundStatusInput, SigningRef,
    TransferRequest, TransferSource, UserId,
};

/// Namespace for deterministic contribution transfer tokens.
const CONTRIBUTION_TOKEN_NAMESPACE: Uuid = Uuid::from_u128(0x5d0c_8a3e_41f2_4b6e_9c1d_7e2a_b4f0_c913);

/// Input for [`RoundLedgerService::record_contribution`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordContributionRequest {
    /// Group paid into.
    pub group_id: GroupId,
    /// Paying member.
    pub actor: UserId,
    /// Round paid for.
    pub round: u32,
    /// Amount offered; must equal the fixed contribution exactly.
    pub amount: Money,
    /// Authorisation for debiting the member's wallet.
    pub signing: SigningRef,
}

/// Outcome of a recorded contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionReceipt {
    /// The confirmed contribution.
    pub contribution: RoundContribution,
    /// Round status recomputed in the same transaction.
    pub status: RoundStatus,
}

/// Outcome of authorising a round payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundAuthorization {
    /// Updated round status.
    pub status: RoundStatus,
    /// Scheduled recipient of the round.
    pub recipient: Member,
}

/// Token the ledger uses to deduplicate a member's transfer for a round.
///
/// # Examples
/// ```
/// use chama_backend::domain::{contribution_token, GroupId, UserId};
///
/// let group = GroupId::random();
/// let user = UserId::random();
/// assert_eq!(contribution_token(group, user, 1), contribution_token(group, user, 1));
/// assert_ne!(contribution_token(group, user, 1), contribution_token(group, user, 2));
/// ```
#[must_use]
pub fn contribution_token(group_id: GroupId, user_id: UserId, round: u32) -> Uuid {
    Uuid::new_v5(
        &CONTRIBUTION_TOKEN_NAMESPACE,
        format!("{group_id}:{user_id}:{round}").as_bytes(),
    )
}

/// Round ledger operations.
#[derive(Clone)]
pub struct RoundLedgerService {
    groups: Arc<dyn GroupRepository>,
    members: Arc<dyn MemberRepository>,
    rounds: Arc<dyn RoundLedgerRepository>,
    ledger: Arc<dyn LedgerGateway>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl RoundLedgerService {
    /// Build the service from the shared port bundle.
    #[must_use]
    pub fn new(ports: &ServicePorts) -> Self {
        Self {
            groups: Arc::clone(&ports.groups),
            members: Arc::clone(&ports.members),
            rounds: Arc::clone(&ports.rounds),
            ledger: Arc::clone(&ports.ledger),
            notifier: Notifier::new(Arc::clone(&ports.notifications)),
            clock: Arc::clone(&ports.clock),
        }
    }

    /// Transfer a member's contribution to the group wallet and record it.
    ///
    /// Every validation runs before the transfer; nothing is written when a
    /// check or the transfer fails.
    ///
    /// # Errors
    /// `NotFound` for unknown groups, `Forbidden` for non-members,
    /// `PreconditionFailed` for inactive groups, `InvalidRequest` for an
    /// out-of-range round or an amount mismatch, `Conflict` for a repeat
    /// contribution and `ExternalFailure` when the transfer fails.
    pub async fn record_contribution(
        &self,
        request: RecordContributionRequest,
    ) -> Result<ContributionReceipt, Error> {
        let RecordContributionRequest {
            group_id,
            actor,
            round,
            amount,
            signing,
        } = request;
        let group = load_group(self.groups.as_ref(), group_id).await?;
        let member = require_approved_member(self.members.as_ref(), group_id, actor).await?;
        let terms = group.active_terms()?;
        if !terms.contains_round(round) {
            return Err(Error::invalid_request("round is outside the rotation")
                .with_details(json!({ "round": round, "rounds": terms.rotation_length() })));
        }
        if amount != terms.contribution_amount {
            return Err(Error::invalid_request(format!(
                "amount must be exactly {}",
                terms.contribution_amount
            ))
            .with_details(json!({
                "expected": terms.contribution_amount,
                "received": amount,
            })));
        }
        if self.rounds.find_confirmed(group_id, actor, round).await?.is_some() {
            return Err(Error::conflict("already contributed for this round"));
        }

        let transfer = TransferRequest {
            source: TransferSource::Member {
                wallet: member.wallet.clone(),
                signing,
            },
            destination: group.wallet.clone(),
            amount,
            idempotency_token: contribution_token(group_id, actor, round),
        };
        let tx_hash = self.ledger.transfer(&transfer).await.map_err(|err| {
            warn!(error = %err, group_id = %group_id, user_id = %actor, round, "contribution transfer failed");
            Error::from(err)
        })?;

        let contribution = RoundContribution {
            id: ContributionId::random(),
            group_id,
            user_id: actor,
            round,
            amount,
            status: ContributionStatus::Confirmed,
            tx_hash: Some(tx_hash.clone()),
            created_at: self.clock.utc(),
        };
        let status = match self
            .rounds
            .record_contribution(&contribution, terms.contribution_amount)
            .await
        {
            Ok(status) => status,
            Err(err @ RoundLedgerRepositoryError::DuplicateContribution) => {
                error!(
                    group_id = %group_id,
                    user_id = %actor,
                    round,
                    tx_hash = %tx_hash,
                    "transfer settled for a round that already had a confirmed contribution"
                );
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            group_id = %group_id,
            user_id = %actor,
            round,
            contributors = status.contributors_count,
            required = status.required_count,
            "contribution recorded"
        );
        Ok(ContributionReceipt {
            contribution,
            status,
        })
    }

    /// Round status with the per-member paid/unpaid breakdown.
    ///
    /// When no snapshot exists yet the status is derived on the fly.
    ///
    /// # Errors
    /// `NotFound` for unknown groups, `Forbidden` for non-members and
    /// `PreconditionFailed` before activation.
    pub async fn round_report(
        &self,
        group_id: GroupId,
        actor: UserId,
        round: u32,
    ) -> Result<RoundReport, Error> {
        let group = load_group(self.groups.as_ref(), group_id).await?;
        require_approved_member(self.members.as_ref(), group_id, actor).await?;
        let contribution_amount = activated_amount(&group)?;
        let members = approved_members(self.members.as_ref(), group_id).await?;
        let contributions = self.rounds.contributions(group_id, round).await?;
        let status = match self.rounds.round_status(group_id, round).await? {
            Some(status) => status,
            None => {
                let required_count = u32::try_from(members.len()).unwrap_or(u32::MAX);
                RoundStatus::recompute(
                    RoundStatusInput {
                        group_id,
                        round,
                        contribution_amount,
                        required_count,
                        flags: PayoutFlags::default(),
                    },
                    &contributions,
                )
                .map_err(|err| Error::internal(err.to_string()))?
            }
        };
        Ok(RoundReport::build(status, members, &contributions))
    }

    /// Recompute and store a round's status from its contributions.
    ///
    /// # Errors
    /// `Forbidden` for non-admins and `PreconditionFailed` before activation.
    pub async fn rebuild_round_status(
        &self,
        group_id: GroupId,
        actor: UserId,
        round: u32,
    ) -> Result<RoundStatus, Error> {
        let group = load_group(self.groups.as_ref(), group_id).await?;
        require_admin_or_creator(self.members.as_ref(), group_id, actor).await?;
        let contribution_amount = activated_amount(&group)?;
        let status = self
            .rounds
            .rebuild_status(group_id, round, contribution_amount, self.clock.utc())
            .await?;
        info!(group_id = %group_id, round, "round status rebuilt");
        Ok(status)
    }

    /// Mark a fully paid round as authorised for payout.
    ///
    /// # Errors
    /// `Forbidden` for non-admins, `PreconditionFailed` when members still
    /// owe contributions, `NotFound` when no recipient is scheduled.
    pub async fn authorize_round_payout(
        &self,
        group_id: GroupId,
        actor: UserId,
        round: u32,
    ) -> Result<RoundAuthorization, Error> {
        let group = load_group(self.groups.as_ref(), group_id).await?;
        require_admin_or_creator(self.members.as_ref(), group_id, actor).await?;
        activated_amount(&group)?;

        let current = self.rounds.round_status(group_id, round).await?;
        let (paid, required) = match &current {
            Some(status) => (status.contributors_count, status.required_count),
            None => (0, self.members.count_approved(group_id).await?),
        };
        if current.as_ref().is_none_or(|status| !status.is_fully_paid()) {
            return Err(not_fully_paid(paid, required));
        }
        let status = self
            .rounds
            .authorize_payout(group_id, round, self.clock.utc())
            .await?
            .ok_or_else(|| not_fully_paid(paid, required))?;

        let entry = self
            .groups
            .payout_schedule(group_id)
            .await?
            .into_iter()
            .find(|entry| entry.round == round)
            .ok_or_else(|| Error::not_found(format!("no payout scheduled for round {round}")))?;
        let recipient = self
            .members
            .find(group_id, entry.recipient_id)
            .await?
            .ok_or_else(|| Error::not_found("scheduled recipient is not a member"))?;

        let members = approved_members(self.members.as_ref(), group_id).await?;
        self.notifier
            .broadcast(
                &members,
                None,
                group_id,
                NotificationKind::RoundPayoutAuthorized,
                "Round payout authorised",
                &format!(
                    "Round {round} of {} is fully paid; {} will receive {}",
                    group.name, recipient.wallet, entry.amount
                ),
            )
            .await;
        info!(group_id = %group_id, round, recipient_id = %recipient.user_id, "round payout authorised");
        Ok(RoundAuthorization { status, recipient })
    }
}

fn activated_amount(group: &Group) -> Result<Money, Error> {
    group
        .terms
        .as_ref()
        .map(|terms| terms.contribution_amount)
        .ok_or_else(|| Error::precondition_failed("group has not been activated"))
}

fn not_fully_paid(paid: u32, required: u32) -> Error {
    Error::precondition_failed(format!("{paid}/{required} members have paid"))
        .with_details(json!({ "paid": paid, "required": required }))
}

#[cfg(test)]
#[path = "round_ledger_service_tests.rs"]
mod tests;
