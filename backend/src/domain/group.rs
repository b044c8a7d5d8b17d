//! Savings group aggregate, contribution terms and rotation order.

use std::collections::HashSet;

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::text_enum::text_enum;
use super::{Error, GroupId, Member, Money, PayoutScheduleEntry, ScheduleStatus, UserId, WalletAddress};

/// Default minimum number of approved members before approval.
pub const DEFAULT_MIN_MEMBERS: u32 = 3;
/// Default maximum number of approved members.
pub const DEFAULT_MAX_MEMBERS: u32 = 20;

text_enum! {
    /// Activation lifecycle of a group.
    pub enum GroupStatus as "group status" {
        /// Collecting members; no contributions yet.
        Pending => "pending",
        /// Terms fixed; rounds in progress.
        Active => "active",
        /// Every rotation slot has been paid out.
        Completed => "completed",
    }
}

/// Terms fixed when a group is activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionTerms {
    /// Amount every approved member pays per round.
    pub contribution_amount: Money,
    /// Days between contribution deadlines.
    pub period_days: u32,
    /// Recipient of each round, in order; round `n` pays `payout_order[n - 1]`.
    pub payout_order: Vec<UserId>,
}

impl ContributionTerms {
    /// Validate activation terms against the current approved members.
    ///
    /// The rotation must list every approved member exactly once.
    ///
    /// # Errors
    /// Returns [`Error`] with code `InvalidRequest` when the amount or period
    /// is not positive, the order is empty, contains duplicates or unknown
    /// members, or does not cover every approved member.
    pub fn new(
        contribution_amount: Money,
        period_days: u32,
        payout_order: Vec<UserId>,
        approved_members: &[Member],
    ) -> Result<Self, Error> {
        if payout_order.is_empty() {
            return Err(Error::invalid_request("payout order must not be empty"));
        }
        if !contribution_amount.is_positive() {
            return Err(Error::invalid_request("contribution amount must be positive"));
        }
        if period_days == 0 {
            return Err(Error::invalid_request(
                "contribution period must be at least one day",
            ));
        }

        let mut seen = HashSet::with_capacity(payout_order.len());
        let duplicates: Vec<String> = payout_order
            .iter()
            .filter(|id| !seen.insert(**id))
            .map(ToString::to_string)
            .collect();
        if !duplicates.is_empty() {
            return Err(Error::invalid_request("payout order lists a member more than once")
                .with_details(json!({ "duplicates": duplicates })));
        }

        let approved: HashSet<UserId> = approved_members
            .iter()
            .filter(|member| member.is_approved())
            .map(|member| member.user_id)
            .collect();
        let unknown: Vec<String> = payout_order
            .iter()
            .filter(|id| !approved.contains(*id))
            .map(ToString::to_string)
            .collect();
        if !unknown.is_empty() {
            return Err(
                Error::invalid_request("payout order names users who are not approved members")
                    .with_details(json!({ "unknownMembers": unknown })),
            );
        }
        if payout_order.len() != approved.len() {
            return Err(Error::invalid_request(
                "payout order must include every approved member",
            )
            .with_details(json!({
                "orderLength": payout_order.len(),
                "approvedMembers": approved.len(),
            })));
        }

        Ok(Self {
            contribution_amount,
            period_days,
            payout_order,
        })
    }

    /// Number of rounds in one full rotation.
    #[must_use]
    pub fn rotation_length(&self) -> u32 {
        u32::try_from(self.payout_order.len()).unwrap_or(u32::MAX)
    }

    /// Recipient scheduled for `round` (1-based).
    #[must_use]
    pub fn recipient_for_round(&self, round: u32) -> Option<UserId> {
        let index = usize::try_from(round.checked_sub(1)?).ok()?;
        self.payout_order.get(index).copied()
    }

    /// Whether `round` is a valid 1-based index into the rotation.
    #[must_use]
    pub fn contains_round(&self, round: u32) -> bool {
        (1..=self.rotation_length()).contains(&round)
    }

    /// Pot paid to the recipient of one round.
    ///
    /// # Errors
    /// Returns an internal error when the product overflows.
    pub fn round_pot(&self, member_count: u32) -> Result<Money, Error> {
        self.contribution_amount
            .checked_mul(member_count)
            .map_err(|err| Error::internal(format!("round pot overflow: {err}")))
    }

    /// Build one schedule entry per rotation slot.
    ///
    /// Slot `i` (0-based) is due `i * period_days` after `activated_at`.
    ///
    /// # Errors
    /// Returns an internal error when dates or amounts overflow.
    pub fn schedule(
        &self,
        group_id: GroupId,
        activated_at: DateTime<Utc>,
        member_count: u32,
    ) -> Result<Vec<PayoutScheduleEntry>, Error> {
        let amount = self.round_pot(member_count)?;
        let mut due_date = activated_at;
        let mut entries = Vec::with_capacity(self.payout_order.len());
        for (round, recipient_id) in (1_u32..).zip(&self.payout_order) {
            entries.push(PayoutScheduleEntry {
                group_id,
                round,
                recipient_id: *recipient_id,
                amount,
                due_date,
                status: ScheduleStatus::Scheduled,
                paid_at: None,
                tx_hash: None,
            });
            due_date = add_days(due_date, self.period_days)?;
        }
        Ok(entries)
    }
}

pub(crate) fn add_days(at: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>, Error> {
    at.checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| Error::internal("contribution date out of range"))
}

/// Validated input for creating a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDraft {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Custodial wallet receiving contributions.
    pub wallet: WalletAddress,
    /// Approved members required before approval.
    pub min_members: u32,
    /// Cap on approved members.
    pub max_members: u32,
}

impl GroupDraft {
    /// Validate creation input, applying member-count defaults.
    ///
    /// # Errors
    /// Returns `InvalidRequest` for a blank name or inconsistent bounds.
    pub fn new(
        name: &str,
        description: &str,
        wallet: WalletAddress,
        min_members: Option<u32>,
        max_members: Option<u32>,
    ) -> Result<Self, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_request("group name must not be empty"));
        }
        let min_members = min_members.unwrap_or(DEFAULT_MIN_MEMBERS);
        let max_members = max_members.unwrap_or(DEFAULT_MAX_MEMBERS);
        if min_members == 0 || min_members > max_members {
            return Err(Error::invalid_request(
                "member bounds must satisfy 1 <= minMembers <= maxMembers",
            )
            .with_details(json!({ "minMembers": min_members, "maxMembers": max_members })));
        }
        Ok(Self {
            name: name.to_owned(),
            description: description.trim().to_owned(),
            wallet,
            min_members,
            max_members,
        })
    }
}

/// A savings circle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Identifier.
    pub id: GroupId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Member holding the creator role.
    pub creator_id: UserId,
    /// Custodial wallet receiving contributions and funding payouts.
    pub wallet: WalletAddress,
    /// Approved members required before approval.
    pub min_members: u32,
    /// Cap on approved members.
    pub max_members: u32,
    /// Set once the creator approves the roster.
    pub is_approved: bool,
    /// Activation lifecycle.
    pub status: GroupStatus,
    /// Terms fixed at activation.
    pub terms: Option<ContributionTerms>,
    /// Round currently collecting; 0 before activation.
    pub current_round: u32,
    /// Next contribution deadline while active.
    pub next_contribution_date: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// State change applied to a group when a round's payout completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundAdvance {
    /// Group being advanced.
    pub group_id: GroupId,
    /// Round whose payout completed; the update applies only while the group
    /// is still on this round.
    pub completed_round: u32,
    /// New value of `current_round`.
    pub next_round: u32,
    /// New contribution deadline; `None` once the rotation is finished.
    pub next_contribution_date: Option<DateTime<Utc>>,
    /// Status after the advance.
    pub status: GroupStatus,
}

impl Group {
    /// Build a new pending group created by `creator_id`.
    #[must_use]
    pub fn create(id: GroupId, creator_id: UserId, draft: GroupDraft, now: DateTime<Utc>) -> Self {
        let GroupDraft {
            name,
            description,
            wallet,
            min_members,
            max_members,
        } = draft;
        Self {
            id,
            name,
            description,
            creator_id,
            wallet,
            min_members,
            max_members,
            is_approved: false,
            status: GroupStatus::Pending,
            terms: None,
            current_round: 0,
            next_contribution_date: None,
            created_at: now,
        }
    }

    /// Terms of an active group.
    ///
    /// # Errors
    /// Returns `PreconditionFailed` unless the group is active.
    pub fn active_terms(&self) -> Result<&ContributionTerms, Error> {
        match (&self.status, &self.terms) {
            (GroupStatus::Active, Some(terms)) => Ok(terms),
            _ => Err(Error::precondition_failed("group is not active")
                .with_details(json!({ "status": self.status.as_str() }))),
        }
    }

    /// Compute the advance applied after the payout for the current round.
    ///
    /// `current_round` increments by one and the deadline moves forward by one
    /// period. Completing the final rotation slot marks the group completed
    /// and clears the deadline.
    ///
    /// # Errors
    /// Returns `PreconditionFailed` when the group is not active and an
    /// internal error when the round counter or date overflows.
    pub fn advance_after_payout(&self) -> Result<RoundAdvance, Error> {
        let terms = self.active_terms()?;
        let next_round = self
            .current_round
            .checked_add(1)
            .ok_or_else(|| Error::internal("round counter overflow"))?;
        let finished = self.current_round >= terms.rotation_length();
        let next_contribution_date = if finished {
            None
        } else {
            self.next_contribution_date
                .map(|date| add_days(date, terms.period_days))
                .transpose()?
        };
        Ok(RoundAdvance {
            group_id: self.id,
            completed_round: self.current_round,
            next_round,
            next_contribution_date,
            status: if finished {
                GroupStatus::Completed
            } else {
                GroupStatus::Active
            },
        })
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
