//! Assemble [`ServicePorts`] from runtime settings.
//!
//! A configured database selects the Diesel adapters and runs migrations;
//! otherwise everything lives in the in-memory store. A missing ledger URL
//! selects the fixture ledger.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use crate::domain::ports::{FixtureLedgerGateway, LedgerGateway, ServicePorts};
use crate::outbound::ledger::HttpLedgerGateway;
use crate::outbound::memory::{MemoryNotificationSink, MemoryStore};
use crate::outbound::persistence::{
    DbPool, DieselGroupRepository, DieselMemberRepository, DieselNotificationSink,
    DieselPayoutRepository, DieselRoundLedgerRepository, DieselUserDirectory, MigrationError,
    PoolConfig, PoolError, run_migrations,
};
use crate::settings::{ChamaSettings, SettingsError};

/// Failures while wiring adapters at start-up.
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    /// A setting was invalid.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// Migrations failed.
    #[error(transparent)]
    Migrations(#[from] MigrationError),
    /// The pool could not be built.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// The ledger HTTP client could not be built.
    #[error("failed to build ledger client: {0}")]
    LedgerClient(#[from] reqwest::Error),
}

fn ledger_gateway(settings: &ChamaSettings) -> Result<Arc<dyn LedgerGateway>, WiringError> {
    match settings.ledger_url()? {
        Some(url) => {
            info!(ledger_url = %url, "using HTTP ledger gateway");
            Ok(Arc::new(HttpLedgerGateway::new(url, settings.ledger_timeout())?))
        }
        None => {
            warn!("CHAMA_LEDGER_URL unset; using fixture ledger (transfers are not real)");
            Ok(Arc::new(FixtureLedgerGateway))
        }
    }
}

fn diesel_ports(
    pool: &DbPool,
    ledger: Arc<dyn LedgerGateway>,
    clock: Arc<dyn Clock>,
) -> ServicePorts {
    ServicePorts {
        groups: Arc::new(DieselGroupRepository::new(pool.clone())),
        members: Arc::new(DieselMemberRepository::new(pool.clone())),
        rounds: Arc::new(DieselRoundLedgerRepository::new(pool.clone())),
        payouts: Arc::new(DieselPayoutRepository::new(pool.clone())),
        users: Arc::new(DieselUserDirectory::new(pool.clone())),
        ledger,
        notifications: Arc::new(DieselNotificationSink::new(pool.clone())),
        inbox: Arc::new(DieselNotificationSink::new(pool.clone())),
        clock,
    }
}

/// Build the port bundle the services run against.
///
/// # Errors
///
/// Returns [`WiringError`] when settings are invalid, the database is
/// unreachable or migrations fail.
pub async fn build_service_ports(settings: &ChamaSettings) -> Result<ServicePorts, WiringError> {
    let ledger = ledger_gateway(settings)?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    match settings.database_url() {
        Some(url) => {
            run_migrations(url).await?;
            let pool = DbPool::new(
                PoolConfig::new(url).with_max_size(settings.db_max_connections()),
            )
            .await?;
            Ok(diesel_ports(&pool, ledger, clock))
        }
        None => {
            warn!("CHAMA_DATABASE_URL unset; state is held in memory only");
            let notifications = Arc::new(MemoryNotificationSink::with_clock(Arc::clone(&clock)));
            Ok(MemoryStore::new().service_ports(ledger, notifications, clock))
        }
    }
}
