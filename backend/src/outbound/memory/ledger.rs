//! Scripted ledger double.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ports::{LedgerError, LedgerGateway};
use crate::domain::{Money, TransferRequest, TxHash, WalletAddress};

/// A transfer accepted by [`ScriptedLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransfer {
    /// Wallet debited.
    pub from: WalletAddress,
    /// Wallet credited.
    pub to: WalletAddress,
    /// Amount moved.
    pub amount: Money,
    /// Token supplied with the transfer.
    pub idempotency_token: Uuid,
    /// Hash returned to the caller.
    pub tx_hash: TxHash,
}

#[derive(Debug, Default)]
struct LedgerState {
    failures: VecDeque<LedgerError>,
    balances: HashMap<WalletAddress, Money>,
    transfers: Vec<RecordedTransfer>,
}

/// Ledger double whose failures and balances are scripted by the caller.
///
/// Transfers succeed unless a failure has been queued with
/// [`ScriptedLedger::fail_next_transfer`]. Submitting the same idempotency
/// token twice returns the original hash without recording a second move.
/// Wallets without a scripted balance report an unlimited balance.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl ScriptedLedger {
    /// Create a ledger that accepts every transfer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an error for the next transfer.
    pub fn fail_next_transfer(&self, error: LedgerError) {
        self.state().failures.push_back(error);
    }

    /// Fix the balance reported for `wallet`.
    pub fn set_balance(&self, wallet: WalletAddress, balance: Money) {
        self.state().balances.insert(wallet, balance);
    }

    /// Transfers accepted so far, oldest first.
    #[must_use]
    pub fn transfers(&self) -> Vec<RecordedTransfer> {
        self.state().transfers.clone()
    }
}

#[async_trait]
impl LedgerGateway for ScriptedLedger {
    async fn transfer(&self, request: &TransferRequest) -> Result<TxHash, LedgerError> {
        let mut state = self.state();
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        if let Some(previous) = state
            .transfers
            .iter()
            .find(|transfer| transfer.idempotency_token == request.idempotency_token)
        {
            return Ok(previous.tx_hash.clone());
        }
        let tx_hash = TxHash::new(format!("tx-{}", request.idempotency_token.simple()))
            .map_err(|err| LedgerError::decode(err.to_string()))?;
        state.transfers.push(RecordedTransfer {
            from: request.source.wallet().clone(),
            to: request.destination.clone(),
            amount: request.amount,
            idempotency_token: request.idempotency_token,
            tx_hash: tx_hash.clone(),
        });
        Ok(tx_hash)
    }

    async fn balance(&self, wallet: &WalletAddress) -> Result<Money, LedgerError> {
        match self.state().balances.get(wallet) {
            Some(balance) => Ok(*balance),
            None => Money::from_stroops(i64::MAX).map_err(|err| LedgerError::decode(err.to_string())),
        }
    }
}
