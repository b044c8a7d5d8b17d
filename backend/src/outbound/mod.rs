//! Outbound adapters implementing the domain ports.
//!
//! - **persistence**: PostgreSQL repositories using Diesel.
//! - **ledger**: reqwest client for the ledger collaborator.
//! - **memory**: in-process store, scripted ledger and notification inbox.
//! - **wiring**: selects adapters from runtime settings.
//!
//! Adapters translate between domain types and infrastructure
//! representations and contain no business rules.

pub mod ledger;
pub mod memory;
pub mod persistence;
pub mod wiring;
