//! Port for persisting groups and their payout schedules.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ContributionTerms, Group, GroupId, Member, PayoutScheduleEntry};

use super::define_port_error;

define_port_error! {
    /// Errors raised by group persistence adapters.
    pub enum GroupRepositoryError {
        /// Connection or pool failure.
        Connection { message: String } => "group repository connection failed: {message}",
        /// Query or row mapping failure.
        Query { message: String } => "group repository query failed: {message}",
        /// The group changed state concurrently.
        StaleState { message: String } => "group state changed concurrently: {message}",
    }
}

/// Everything written when a group is activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupActivation {
    /// Group being activated.
    pub group_id: GroupId,
    /// Fixed contribution terms and rotation.
    pub terms: ContributionTerms,
    /// First contribution deadline.
    pub next_contribution_date: DateTime<Utc>,
    /// One entry per rotation slot.
    pub schedule: Vec<PayoutScheduleEntry>,
}

/// Persistence for [`Group`] aggregates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Insert a new group together with its creator membership.
    async fn create(&self, group: &Group, creator: &Member) -> Result<(), GroupRepositoryError>;

    /// Load a group by identifier.
    async fn find_by_id(&self, id: GroupId) -> Result<Option<Group>, GroupRepositoryError>;

    /// Set the approval flag.
    async fn mark_approved(&self, id: GroupId) -> Result<(), GroupRepositoryError>;

    /// Activate a pending approved group and write its schedule atomically.
    ///
    /// Fails with [`GroupRepositoryError::StaleState`] when the group is no
    /// longer pending.
    async fn activate(&self, activation: &GroupActivation) -> Result<(), GroupRepositoryError>;

    /// Schedule entries for a group ordered by round.
    async fn payout_schedule(
        &self,
        id: GroupId,
    ) -> Result<Vec<PayoutScheduleEntry>, GroupRepositoryError>;

    /// Active groups whose next contribution date is at or before `cutoff`.
    async fn list_due_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Group>, GroupRepositoryError>;
}
