//! Payout requests, admin votes and the rotation payout schedule.
//!
//! A request moves `pending -> approved -> completed`, or `pending ->
//! rejected`, or `approved -> failed` when the ledger transfer fails. Approval
//! needs `K` distinct admin votes while a single rejection is a veto.

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::text_enum::text_enum;
use super::{GroupId, Money, PayoutRequestId, TxHash, UserId};

/// Default approval threshold `K`.
pub const DEFAULT_APPROVAL_THRESHOLD: u32 = 2;

text_enum! {
    /// Lifecycle state of a payout request.
    pub enum PayoutStatus as "payout status" {
        /// Collecting admin votes.
        Pending => "pending",
        /// Threshold reached; transfer in flight.
        Approved => "approved",
        /// Vetoed by an admin.
        Rejected => "rejected",
        /// Funds moved and the round advanced.
        Completed => "completed",
        /// The ledger transfer failed.
        Failed => "failed",
    }
}

impl PayoutStatus {
    /// Whether the request still blocks new requests for its round.
    #[must_use]
    pub const fn is_outstanding(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

text_enum! {
    /// State of a rotation schedule slot.
    pub enum ScheduleStatus as "schedule status" {
        /// Awaiting payout.
        Scheduled => "scheduled",
        /// Payout completed.
        Paid => "paid",
    }
}

/// One admin's vote on a payout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutApproval {
    /// Request voted on.
    pub request_id: PayoutRequestId,
    /// Voting admin.
    pub admin_id: UserId,
    /// `true` approves, `false` rejects.
    pub approved: bool,
    /// When the vote was cast.
    pub voted_at: DateTime<Utc>,
}

/// Proposal to pay a round's pot to a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    /// Identifier.
    pub id: PayoutRequestId,
    /// Owning group.
    pub group_id: GroupId,
    /// Member receiving the funds.
    pub recipient_id: UserId,
    /// Amount to transfer.
    pub amount: Money,
    /// Round being paid out.
    pub round: u32,
    /// Lifecycle state.
    pub status: PayoutStatus,
    /// Token passed to the ledger so a retried transfer is not applied twice.
    pub idempotency_token: Uuid,
    /// Ledger transaction once completed.
    pub tx_hash: Option<TxHash>,
    /// Admin who raised the request.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Votes cast so far.
    pub approvals: Vec<PayoutApproval>,
}

impl PayoutRequest {
    /// Whether `admin_id` has already voted.
    #[must_use]
    pub fn has_vote_from(&self, admin_id: UserId) -> bool {
        self.approvals.iter().any(|vote| vote.admin_id == admin_id)
    }

    /// Tally of the votes cast so far.
    #[must_use]
    pub fn tally(&self) -> VoteTally {
        VoteTally::from_votes(&self.approvals)
    }
}

/// Counts of approve and reject votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    /// Votes to approve.
    pub approvals: u32,
    /// Votes to reject.
    pub rejections: u32,
}

impl VoteTally {
    /// Count the votes in `votes`.
    #[must_use]
    pub fn from_votes(votes: &[PayoutApproval]) -> Self {
        votes.iter().fold(Self::default(), |tally, vote| {
            if vote.approved {
                Self {
                    approvals: tally.approvals.saturating_add(1),
                    ..tally
                }
            } else {
                Self {
                    rejections: tally.rejections.saturating_add(1),
                    ..tally
                }
            }
        })
    }
}

/// Result of applying the approval policy to a tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// More approvals are needed.
    StillPending,
    /// Threshold reached; execute the transfer.
    Approved,
    /// Vetoed.
    Rejected,
}

/// Fixed-threshold approval with single-vote veto.
///
/// # Examples
/// ```
/// use chama_backend::domain::{ApprovalPolicy, VoteOutcome, VoteTally};
///
/// let policy = ApprovalPolicy::default();
/// let one = VoteTally { approvals: 1, rejections: 0 };
/// let vetoed = VoteTally { approvals: 1, rejections: 1 };
/// assert_eq!(policy.decide(one), VoteOutcome::StillPending);
/// assert_eq!(policy.decide(vetoed), VoteOutcome::Rejected);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalPolicy {
    threshold: NonZeroU32,
}

impl ApprovalPolicy {
    /// Build a policy requiring `threshold` approvals.
    #[must_use]
    pub const fn new(threshold: NonZeroU32) -> Self {
        Self { threshold }
    }

    /// Number of approvals required.
    #[must_use]
    pub const fn threshold(self) -> u32 {
        self.threshold.get()
    }

    /// Decide the request's fate. Any rejection wins over approvals.
    #[must_use]
    pub const fn decide(self, tally: VoteTally) -> VoteOutcome {
        if tally.rejections >= 1 {
            VoteOutcome::Rejected
        } else if tally.approvals >= self.threshold.get() {
            VoteOutcome::Approved
        } else {
            VoteOutcome::StillPending
        }
    }
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self::new(NonZeroU32::MIN.saturating_add(DEFAULT_APPROVAL_THRESHOLD - 1))
    }
}

/// One rotation slot: who is paid in which round and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutScheduleEntry {
    /// Owning group.
    pub group_id: GroupId,
    /// Round number (1-based).
    pub round: u32,
    /// Scheduled recipient.
    pub recipient_id: UserId,
    /// Pot paid in this round.
    pub amount: Money,
    /// Planned payout date.
    pub due_date: DateTime<Utc>,
    /// Slot state.
    pub status: ScheduleStatus,
    /// When the payout completed.
    pub paid_at: Option<DateTime<Utc>>,
    /// Ledger transaction of the payout.
    pub tx_hash: Option<TxHash>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn policy(threshold: u32) -> ApprovalPolicy {
        ApprovalPolicy::new(NonZeroU32::new(threshold).expect("non-zero threshold"))
    }

    fn vote(approved: bool) -> PayoutApproval {
        PayoutApproval {
            request_id: PayoutRequestId::random(),
            admin_id: UserId::random(),
            approved,
            voted_at: Utc::now(),
        }
    }

    #[rstest]
    #[case::one_of_two(2, 1, 0, VoteOutcome::StillPending)]
    #[case::two_of_two(2, 2, 0, VoteOutcome::Approved)]
    #[case::single_admin(1, 1, 0, VoteOutcome::Approved)]
    #[case::veto_after_approval(2, 1, 1, VoteOutcome::Rejected)]
    #[case::veto_beats_threshold(2, 2, 1, VoteOutcome::Rejected)]
    #[case::no_votes(2, 0, 0, VoteOutcome::StillPending)]
    fn policy_decides(
        #[case] threshold: u32,
        #[case] approvals: u32,
        #[case] rejections: u32,
        #[case] expected: VoteOutcome,
    ) {
        let tally = VoteTally {
            approvals,
            rejections,
        };
        assert_eq!(policy(threshold).decide(tally), expected);
    }

    #[rstest]
    fn default_threshold_is_two() {
        assert_eq!(ApprovalPolicy::default().threshold(), DEFAULT_APPROVAL_THRESHOLD);
    }

    #[rstest]
    fn tally_counts_votes() {
        let tally = VoteTally::from_votes(&[vote(true), vote(false), vote(true)]);
        assert_eq!(
            tally,
            VoteTally {
                approvals: 2,
                rejections: 1
            }
        );
    }

    #[rstest]
    #[case(PayoutStatus::Pending, true)]
    #[case(PayoutStatus::Approved, true)]
    #[case(PayoutStatus::Rejected, false)]
    #[case(PayoutStatus::Completed, false)]
    #[case(PayoutStatus::Failed, false)]
    fn outstanding_statuses(#[case] status: PayoutStatus, #[case] expected: bool) {
        assert_eq!(status.is_outstanding(), expected);
    }
}
