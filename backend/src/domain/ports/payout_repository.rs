//! Port for payout requests, votes and atomic completion.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    GroupId, PayoutApproval, PayoutRequest, PayoutRequestId, PayoutStatus, RoundAdvance, TxHash,
    VoteTally,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by payout persistence adapters.
    pub enum PayoutRepositoryError {
        /// Connection or pool failure.
        Connection { message: String } => "payout repository connection failed: {message}",
        /// Query or row mapping failure.
        Query { message: String } => "payout repository query failed: {message}",
        /// A pending or approved request already exists for the round.
        OutstandingRequest => "an outstanding payout request exists for this round",
        /// The admin already voted on the request.
        AlreadyVoted => "vote already recorded for this admin",
        /// The request left `pending` before the vote was written.
        NotPending { status: String } => "payout request is already {status}",
    }
}

/// Everything written when a payout transfer succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutCompletion {
    /// Request being completed.
    pub request_id: PayoutRequestId,
    /// Token the transfer was submitted with.
    pub idempotency_token: Uuid,
    /// Ledger transaction of the transfer.
    pub tx_hash: TxHash,
    /// Completion time.
    pub completed_at: DateTime<Utc>,
    /// Round paid out.
    pub round: u32,
    /// Group update to apply.
    pub advance: RoundAdvance,
}

/// Persistence for [`PayoutRequest`]s and their votes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PayoutRepository: Send + Sync {
    /// Insert a request; fails with `OutstandingRequest` when a pending or
    /// approved request exists for the same `(group, round)`.
    async fn create(&self, request: &PayoutRequest) -> Result<(), PayoutRepositoryError>;

    /// Load a request with its votes.
    async fn find(
        &self,
        id: PayoutRequestId,
    ) -> Result<Option<PayoutRequest>, PayoutRepositoryError>;

    /// Requests of a group, newest first, with their votes.
    async fn list_for_group(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<PayoutRequest>, PayoutRepositoryError>;

    /// Insert a vote and return the tally read back in the same transaction.
    ///
    /// The request status is re-read under a lock; votes on a request that
    /// is no longer pending fail with [`PayoutRepositoryError::NotPending`].
    async fn record_vote(&self, vote: &PayoutApproval) -> Result<VoteTally, PayoutRepositoryError>;

    /// Move the request from `from` to `to`; returns `false` when the request
    /// was no longer in `from`.
    async fn transition(
        &self,
        id: PayoutRequestId,
        from: PayoutStatus,
        to: PayoutStatus,
    ) -> Result<bool, PayoutRepositoryError>;

    /// Record a successful transfer in one transaction: complete the request
    /// (only while it is approved with the given token), advance the group,
    /// mark the schedule slot paid and close the round. Returns `false` when
    /// the request had already left the approved state.
    async fn complete(&self, completion: &PayoutCompletion) -> Result<bool, PayoutRepositoryError>;
}
