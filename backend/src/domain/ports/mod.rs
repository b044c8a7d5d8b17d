//! Domain ports defining the edges of the hexagon.
//!
//! Repositories, the ledger gateway, the notification sink and the user
//! directory are traits implemented by outbound adapters. Each exposes a
//! typed error generated by [`define_port_error!`] so services can map
//! adapter failures onto [`crate::domain::Error`] codes.

mod group_repository;
mod ledger_gateway;
mod macros;
mod member_repository;
mod notification_sink;
mod payout_repository;
mod round_ledger_repository;
mod service_ports;
mod user_directory;

pub(crate) use macros::define_port_error;

pub use group_repository::{GroupActivation, GroupRepository, GroupRepositoryError};
pub use ledger_gateway::{FixtureLedgerGateway, LedgerError, LedgerGateway};
pub use member_repository::{MemberRepository, MemberRepositoryError};
pub use notification_sink::{
    FixtureNotificationSink, NotificationError, NotificationInbox, NotificationSink,
};
pub use payout_repository::{PayoutCompletion, PayoutRepository, PayoutRepositoryError};
pub use round_ledger_repository::{RoundLedgerRepository, RoundLedgerRepositoryError};
pub use service_ports::ServicePorts;
pub use user_directory::{UserDirectory, UserDirectoryError};

#[cfg(test)]
pub use group_repository::MockGroupRepository;
#[cfg(test)]
pub use ledger_gateway::MockLedgerGateway;
#[cfg(test)]
pub use member_repository::MockMemberRepository;
#[cfg(test)]
pub use notification_sink::{MockNotificationInbox, MockNotificationSink};
#[cfg(test)]
pub use payout_repository::MockPayoutRepository;
#[cfg(test)]
pub use round_ledger_repository::MockRoundLedgerRepository;
#[cfg(test)]
pub use user_directory::MockUserDirectory;
