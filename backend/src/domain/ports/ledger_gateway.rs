//! Port for the ledger collaborator that moves and reports funds.

use async_trait::async_trait;

use crate::domain::{Money, TransferRequest, TxHash, WalletAddress};

use super::define_port_error;

define_port_error! {
    /// Errors raised by ledger adapters.
    pub enum LedgerError {
        /// The ledger could not be reached.
        Transport { message: String } => "ledger transport failed: {message}",
        /// The ledger did not answer in time.
        Timeout { message: String } => "ledger request timed out: {message}",
        /// The ledger refused the operation.
        Rejected { message: String } => "ledger rejected the request: {message}",
        /// The ledger answered with an unreadable payload.
        Decode { message: String } => "ledger response could not be decoded: {message}",
    }
}

impl LedgerError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

/// Moves funds between wallets and reports balances.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Submit a transfer; returns the ledger transaction hash.
    async fn transfer(&self, request: &TransferRequest) -> Result<TxHash, LedgerError>;

    /// Current balance of `wallet`.
    async fn balance(&self, wallet: &WalletAddress) -> Result<Money, LedgerError>;
}

/// Ledger stand-in used when no gateway is configured.
///
/// Transfers succeed with a hash derived from the idempotency token so
/// repeated submissions return the same reference; balances are unlimited.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLedgerGateway;

#[async_trait]
impl LedgerGateway for FixtureLedgerGateway {
    async fn transfer(&self, request: &TransferRequest) -> Result<TxHash, LedgerError> {
        TxHash::new(format!("fixture-{}", request.idempotency_token.simple()))
            .map_err(|err| LedgerError::decode(err.to_string()))
    }

    async fn balance(&self, _wallet: &WalletAddress) -> Result<Money, LedgerError> {
        Money::from_stroops(i64::MAX).map_err(|err| LedgerError::decode(err.to_string()))
    }
}
