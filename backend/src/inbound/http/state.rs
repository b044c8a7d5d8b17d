//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and only ever talk to domain
//! services, so they can be exercised against the in-memory adapters.

use crate::domain::ports::ServicePorts;
use crate::domain::{
    ApprovalPolicy, GroupLifecycleService, MembershipService, NotificationService, PayoutEngine,
    RoundLedgerService, UserService,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub users: UserService,
    pub groups: GroupLifecycleService,
    pub members: MembershipService,
    pub rounds: RoundLedgerService,
    pub payouts: PayoutEngine,
    pub notifications: NotificationService,
}

impl HttpState {
    /// Build every service from one port bundle.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use chama_backend::domain::ApprovalPolicy;
    /// use chama_backend::inbound::http::state::HttpState;
    /// use chama_backend::outbound::memory::{MemoryNotificationSink, MemoryStore, ScriptedLedger};
    /// use mockable::DefaultClock;
    ///
    /// let store = MemoryStore::default();
    /// let ports = store.service_ports(
    ///     Arc::new(ScriptedLedger::default()),
    ///     Arc::new(MemoryNotificationSink::default()),
    ///     Arc::new(DefaultClock),
    /// );
    /// let state = HttpState::new(&ports, ApprovalPolicy::default());
    /// assert_eq!(state.payouts.policy().threshold(), 2);
    /// ```
    #[must_use]
    pub fn new(ports: &ServicePorts, policy: ApprovalPolicy) -> Self {
        Self {
            users: UserService::new(ports),
            groups: GroupLifecycleService::new(ports),
            members: MembershipService::new(ports),
            rounds: RoundLedgerService::new(ports),
            payouts: PayoutEngine::new(ports, policy),
            notifications: NotificationService::new(ports),
        }
    }
}
