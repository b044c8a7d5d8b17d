//! Wire DTOs for the ledger collaborator's JSON API.
//!
//! Amounts travel as decimal strings so no precision is lost in transit.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Money, TransferRequest, TransferSource, TxHash};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TransferBodyDto<'a> {
    pub(super) source: SourceDto<'a>,
    pub(super) destination: &'a str,
    pub(super) amount: String,
    pub(super) idempotency_key: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub(super) enum SourceDto<'a> {
    Member {
        wallet: &'a str,
        #[serde(rename = "signingRef")]
        signing_ref: &'a str,
    },
    Custodial {
        wallet: &'a str,
    },
}

impl<'a> From<&'a TransferRequest> for TransferBodyDto<'a> {
    fn from(request: &'a TransferRequest) -> Self {
        let source = match &request.source {
            TransferSource::Member { wallet, signing } => SourceDto::Member {
                wallet: wallet.as_ref(),
                signing_ref: signing.expose(),
            },
            TransferSource::Custodial { wallet } => SourceDto::Custodial {
                wallet: wallet.as_ref(),
            },
        };
        Self {
            source,
            destination: request.destination.as_ref(),
            amount: request.amount.to_string(),
            idempotency_key: request.idempotency_token,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TransferReceiptDto {
    pub(super) tx_hash: String,
}

impl TransferReceiptDto {
    pub(super) fn into_tx_hash(self) -> Result<TxHash, String> {
        TxHash::new(self.tx_hash).map_err(|err| err.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct BalanceDto {
    pub(super) balance: String,
}

impl BalanceDto {
    pub(super) fn into_money(self) -> Result<Money, String> {
        self.balance
            .parse::<Money>()
            .map_err(|err| format!("invalid balance {:?}: {err}", self.balance))
    }
}
