//! Round contributions and the derived round status.
//!
//! `RoundStatus` is a materialised view: it is always recomputed from the
//! confirmed contributions of its `(group, round)` pair plus the payout flags
//! carried over from the previous snapshot, never updated incrementally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::MoneyError;
use super::text_enum::text_enum;
use super::{ContributionId, GroupId, Member, Money, TxHash, UserId};

text_enum! {
    /// Settlement state of one contribution.
    pub enum ContributionStatus as "contribution status" {
        /// Submitted, not yet settled.
        Pending => "pending",
        /// Settled on the ledger; counts towards the round.
        Confirmed => "confirmed",
        /// Settlement failed.
        Failed => "failed",
    }
}

text_enum! {
    /// Collection phase of a round.
    pub enum RoundPhase as "round phase" {
        /// Waiting for members to pay.
        Collecting => "collecting",
        /// Every required member has paid.
        ReadyForPayout => "ready_for_payout",
        /// The round's payout has completed.
        Completed => "completed",
    }
}

/// One member's payment for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundContribution {
    /// Identifier.
    pub id: ContributionId,
    /// Owning group.
    pub group_id: GroupId,
    /// Paying member.
    pub user_id: UserId,
    /// Round paid for.
    pub round: u32,
    /// Amount paid.
    pub amount: Money,
    /// Settlement state.
    pub status: ContributionStatus,
    /// Ledger transaction reference.
    pub tx_hash: Option<TxHash>,
    /// When the contribution was recorded.
    pub created_at: DateTime<Utc>,
}

/// Flags carried between recomputations because contributions cannot
/// express them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayoutFlags {
    /// An admin authorised the round payout.
    pub payout_authorized: bool,
    /// The round payout completed.
    pub payout_completed: bool,
}

/// Summary of one `(group, round)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStatus {
    /// Owning group.
    pub group_id: GroupId,
    /// Round number.
    pub round: u32,
    /// Contribution amount times required count.
    pub total_required: Money,
    /// Sum of confirmed contributions.
    pub total_received: Money,
    /// Number of confirmed contributions.
    pub contributors_count: u32,
    /// Approved members expected to pay.
    pub required_count: u32,
    /// Collection phase.
    pub status: RoundPhase,
    /// Whether an admin authorised the payout.
    pub payout_authorized: bool,
}

/// Inputs for [`RoundStatus::recompute`] other than the contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundStatusInput {
    /// Owning group.
    pub group_id: GroupId,
    /// Round number.
    pub round: u32,
    /// Fixed per-member contribution.
    pub contribution_amount: Money,
    /// Approved member count at recompute time.
    pub required_count: u32,
    /// Flags carried from the previous snapshot.
    pub flags: PayoutFlags,
}

impl RoundStatus {
    /// Derive the round status from its contributions.
    ///
    /// Only confirmed contributions for the input's `(group, round)` count.
    /// The result depends on nothing else, so repeated calls agree.
    ///
    /// # Errors
    /// Returns [`MoneyError::Overflow`] when totals exceed the money range.
    ///
    /// # Examples
    /// ```
    /// use chama_backend::domain::{GroupId, PayoutFlags, RoundPhase, RoundStatus, RoundStatusInput};
    ///
    /// let input = RoundStatusInput {
    ///     group_id: GroupId::random(),
    ///     round: 1,
    ///     contribution_amount: "100".parse().expect("amount"),
    ///     required_count: 3,
    ///     flags: PayoutFlags::default(),
    /// };
    /// let status = RoundStatus::recompute(input, &[]).expect("no overflow");
    /// assert_eq!(status.status, RoundPhase::Collecting);
    /// assert_eq!(status.total_required.to_string(), "300.0");
    /// ```
    pub fn recompute(
        input: RoundStatusInput,
        contributions: &[RoundContribution],
    ) -> Result<Self, MoneyError> {
        let confirmed: Vec<&RoundContribution> = contributions
            .iter()
            .filter(|c| {
                c.group_id == input.group_id
                    && c.round == input.round
                    && c.status == ContributionStatus::Confirmed
            })
            .collect();
        let contributors_count = u32::try_from(confirmed.len()).map_err(|_| MoneyError::Overflow)?;
        let total_received = Money::sum(confirmed.iter().map(|c| c.amount))?;
        let total_required = input.contribution_amount.checked_mul(input.required_count)?;
        let status = if input.flags.payout_completed {
            RoundPhase::Completed
        } else if contributors_count >= input.required_count {
            RoundPhase::ReadyForPayout
        } else {
            RoundPhase::Collecting
        };
        Ok(Self {
            group_id: input.group_id,
            round: input.round,
            total_required,
            total_received,
            contributors_count,
            required_count: input.required_count,
            status,
            payout_authorized: input.flags.payout_authorized,
        })
    }

    /// Flags to carry into the next recomputation.
    #[must_use]
    pub const fn flags(&self) -> PayoutFlags {
        PayoutFlags {
            payout_authorized: self.payout_authorized,
            payout_completed: matches!(self.status, RoundPhase::Completed),
        }
    }

    /// Whether every required member has paid.
    #[must_use]
    pub const fn is_fully_paid(&self) -> bool {
        self.contributors_count >= self.required_count
    }
}

/// Paid/unpaid state of one approved member for a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPaymentStatus {
    /// The member.
    pub member: Member,
    /// Whether a confirmed contribution exists.
    pub has_paid: bool,
    /// The confirmed contribution, if any.
    pub contribution: Option<RoundContribution>,
}

/// Round status together with the per-member breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    /// Cached or freshly derived status.
    pub status: RoundStatus,
    /// One entry per approved member.
    pub members: Vec<MemberPaymentStatus>,
    /// Approved member count.
    pub total_members: u32,
    /// Members with a confirmed contribution.
    pub paid_members: u32,
}

impl RoundReport {
    /// Join approved members against confirmed contributions.
    ///
    /// Members without a confirmed contribution are reported unpaid.
    #[must_use]
    pub fn build(
        status: RoundStatus,
        approved_members: Vec<Member>,
        contributions: &[RoundContribution],
    ) -> Self {
        let members: Vec<MemberPaymentStatus> = approved_members
            .into_iter()
            .map(|member| {
                let contribution = contributions
                    .iter()
                    .find(|c| {
                        c.user_id == member.user_id
                            && c.round == status.round
                            && c.status == ContributionStatus::Confirmed
                    })
                    .cloned();
                MemberPaymentStatus {
                    has_paid: contribution.is_some(),
                    member,
                    contribution,
                }
            })
            .collect();
        let total_members = u32::try_from(members.len()).unwrap_or(u32::MAX);
        let paid = members.iter().filter(|m| m.has_paid).count();
        let paid_members = u32::try_from(paid).unwrap_or(u32::MAX);
        Self {
            status,
            members,
            total_members,
            paid_members,
        }
    }
}

#[cfg(test)]
#[path = "round_tests.rs"]
mod tests;
