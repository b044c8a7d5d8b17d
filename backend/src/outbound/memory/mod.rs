//! In-process adapters.
//!
//! [`MemoryStore`] implements every repository port behind a single lock so
//! each call is atomic, mirroring the transactional guarantees of the
//! PostgreSQL adapters. The server falls back to it when no database is
//! configured, and the integration suites drive services against it.

mod ledger;
mod notifications;
mod store;

pub use ledger::{RecordedTransfer, ScriptedLedger};
pub use notifications::MemoryNotificationSink;
pub use store::MemoryStore;
