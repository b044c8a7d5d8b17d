//! Bundle of driven ports handed to the domain services.

use std::sync::Arc;

use mockable::Clock;

use super::{
    GroupRepository, LedgerGateway, MemberRepository, NotificationInbox, NotificationSink,
    PayoutRepository, RoundLedgerRepository, UserDirectory,
};

/// Shared handles to every driven adapter.
///
/// Services clone the handles they need at construction; nothing in the
/// domain reaches for a process-wide store.
#[derive(Clone)]
pub struct ServicePorts {
    /// Group aggregates and payout schedules.
    pub groups: Arc<dyn GroupRepository>,
    /// Membership registry.
    pub members: Arc<dyn MemberRepository>,
    /// Round contributions and status snapshots.
    pub rounds: Arc<dyn RoundLedgerRepository>,
    /// Payout requests and votes.
    pub payouts: Arc<dyn PayoutRepository>,
    /// Registered identities.
    pub users: Arc<dyn UserDirectory>,
    /// Ledger collaborator.
    pub ledger: Arc<dyn LedgerGateway>,
    /// Notification collaborator.
    pub notifications: Arc<dyn NotificationSink>,
    /// Stored notifications, read back per user.
    pub inbox: Arc<dyn NotificationInbox>,
    /// Source of the current time.
    pub clock: Arc<dyn Clock>,
}
