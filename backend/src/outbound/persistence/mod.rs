//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the domain repository ports backed by
//! PostgreSQL through `diesel-async` and a `bb8` connection pool.
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain types; invariants live in the domain.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Atomic writes**: multi-row updates such as activation, contribution
//!   recording and payout completion run in one transaction.
//!
//! # Example
//!
//! ```ignore
//! use chama_backend::outbound::persistence::{DbPool, DieselGroupRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/chama")).await?;
//! let groups = DieselGroupRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_group_repository;
mod diesel_member_repository;
mod diesel_notification_sink;
mod diesel_payout_repository;
mod diesel_round_ledger_repository;
mod diesel_user_directory;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_group_repository::DieselGroupRepository;
pub use diesel_member_repository::DieselMemberRepository;
pub use diesel_notification_sink::DieselNotificationSink;
pub use diesel_payout_repository::DieselPayoutRepository;
pub use diesel_round_ledger_repository::DieselRoundLedgerRepository;
pub use diesel_user_directory::DieselUserDirectory;
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
