//! Value types exchanged with the ledger collaborator.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

use super::{Money, WalletAddress};

/// Ledger transaction hash returned by a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(String);

/// Error raised for blank transaction hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("transaction hash must not be empty")]
pub struct EmptyTxHashError;

impl TxHash {
    /// Validate and wrap a transaction hash.
    ///
    /// # Errors
    /// Returns [`EmptyTxHashError`] when the value is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyTxHashError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyTxHashError)
        } else {
            Ok(Self(value))
        }
    }
}

impl AsRef<str> for TxHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TxHash {
    type Error = EmptyTxHashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TxHash> for String {
    fn from(value: TxHash) -> Self {
        value.0
    }
}

/// Opaque reference authorising the ledger to debit a member's wallet.
///
/// The value is handed straight to the ledger collaborator. It is never
/// persisted, its `Debug` output is redacted and the buffer is wiped on drop.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SigningRef(String);

impl SigningRef {
    /// Wrap a signing reference.
    #[must_use]
    pub const fn new(value: String) -> Self {
        Self(value)
    }

    /// Expose the raw reference to the ledger adapter.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Drop for SigningRef {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SigningRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningRef(<redacted>)")
    }
}

impl PartialEq for SigningRef {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SigningRef {}

/// Source of funds for a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferSource {
    /// A member wallet debited with the member's signing reference.
    Member {
        /// Wallet to debit.
        wallet: WalletAddress,
        /// Authorisation supplied by the member.
        signing: SigningRef,
    },
    /// A group wallet held in custody by the ledger collaborator.
    Custodial {
        /// Wallet to debit.
        wallet: WalletAddress,
    },
}

impl TransferSource {
    /// Wallet being debited.
    #[must_use]
    pub const fn wallet(&self) -> &WalletAddress {
        match self {
            Self::Member { wallet, .. } | Self::Custodial { wallet } => wallet,
        }
    }
}

/// Instruction to move funds between two wallets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Wallet debited.
    pub source: TransferSource,
    /// Wallet credited.
    pub destination: WalletAddress,
    /// Amount moved.
    pub amount: Money,
    /// Token the ledger uses to deduplicate retried submissions.
    pub idempotency_token: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_ref_debug_is_redacted() {
        let signing = SigningRef::new("SBSECRET".to_owned());
        assert_eq!(format!("{signing:?}"), "SigningRef(<redacted>)");
        assert_eq!(signing.expose(), "SBSECRET");
    }

    #[test]
    fn tx_hash_rejects_blank() {
        assert_eq!(TxHash::new("  "), Err(EmptyTxHashError));
    }
}
