//! Port for round contributions and the cached round status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{GroupId, Money, RoundContribution, RoundStatus, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by round ledger persistence adapters.
    pub enum RoundLedgerRepositoryError {
        /// Connection or pool failure.
        Connection { message: String } => "round ledger connection failed: {message}",
        /// Query or row mapping failure.
        Query { message: String } => "round ledger query failed: {message}",
        /// A confirmed contribution already exists for `(group, member, round)`.
        DuplicateContribution => "contribution already recorded for this round",
    }
}

/// Persistence for [`RoundContribution`] rows and [`RoundStatus`] snapshots.
///
/// Adapters recompute the status with [`RoundStatus::recompute`] from a
/// fresh read of the confirmed rows inside the same transaction that writes
/// them, so concurrent contributions cannot leave a stale snapshot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoundLedgerRepository: Send + Sync {
    /// Confirmed contribution for `(group, member, round)`, if any.
    async fn find_confirmed(
        &self,
        group_id: GroupId,
        user_id: UserId,
        round: u32,
    ) -> Result<Option<RoundContribution>, RoundLedgerRepositoryError>;

    /// Insert a confirmed contribution and recompute the round status in the
    /// same transaction. The snapshot is stamped with the contribution's
    /// `created_at`.
    async fn record_contribution(
        &self,
        contribution: &RoundContribution,
        contribution_amount: Money,
    ) -> Result<RoundStatus, RoundLedgerRepositoryError>;

    /// Contributions recorded for a round, oldest first.
    async fn contributions(
        &self,
        group_id: GroupId,
        round: u32,
    ) -> Result<Vec<RoundContribution>, RoundLedgerRepositoryError>;

    /// Cached status for a round.
    async fn round_status(
        &self,
        group_id: GroupId,
        round: u32,
    ) -> Result<Option<RoundStatus>, RoundLedgerRepositoryError>;

    /// Recompute and store the status from the contribution rows, stamping
    /// the snapshot with `updated_at`.
    async fn rebuild_status(
        &self,
        group_id: GroupId,
        round: u32,
        contribution_amount: Money,
        updated_at: DateTime<Utc>,
    ) -> Result<RoundStatus, RoundLedgerRepositoryError>;

    /// Flag the round payout as authorised; `None` when no snapshot exists.
    async fn authorize_payout(
        &self,
        group_id: GroupId,
        round: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<RoundStatus>, RoundLedgerRepositoryError>;
}
