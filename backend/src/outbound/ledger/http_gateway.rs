//! Reqwest-backed ledger gateway.
//!
//! Owns transport details only: request serialisation, the request timeout,
//! HTTP status mapping and JSON decoding. Timeouts surface as
//! [`LedgerError::Timeout`] and are treated as failed transfers upstream.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::dto::{BalanceDto, TransferBodyDto, TransferReceiptDto};
use crate::domain::ports::{LedgerError, LedgerGateway};
use crate::domain::{Money, TransferRequest, TxHash, WalletAddress};

const USER_AGENT: &str = "chama-backend-ledger/0.1";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Ledger gateway that talks JSON over HTTP to one base URL.
pub struct HttpLedgerGateway {
    client: Client,
    base: Url,
}

impl HttpLedgerGateway {
    /// Build a gateway with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base: normalise_base(base),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, LedgerError> {
        self.base
            .join(path)
            .map_err(|err| LedgerError::transport(format!("invalid ledger path {path}: {err}")))
    }
}

/// Ensure the base path ends with `/` so relative joins append segments.
fn normalise_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[async_trait]
impl LedgerGateway for HttpLedgerGateway {
    async fn transfer(&self, request: &TransferRequest) -> Result<TxHash, LedgerError> {
        let url = self.endpoint("transfers")?;
        let body = TransferBodyDto::from(request);
        let response = self
            .client
            .post(url)
            .header(IDEMPOTENCY_HEADER, request.idempotency_token.to_string())
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, bytes.as_ref()));
        }
        let hash = parse_transfer(bytes.as_ref())?;
        debug!(token = %request.idempotency_token, tx_hash = %hash, "ledger transfer accepted");
        Ok(hash)
    }

    async fn balance(&self, wallet: &WalletAddress) -> Result<Money, LedgerError> {
        let url = self.endpoint(&format!("accounts/{}/balance", wallet.as_ref()))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, bytes.as_ref()));
        }
        parse_balance(bytes.as_ref())
    }
}

fn parse_transfer(body: &[u8]) -> Result<TxHash, LedgerError> {
    let receipt: TransferReceiptDto = serde_json::from_slice(body)
        .map_err(|err| LedgerError::decode(format!("invalid transfer receipt: {err}")))?;
    receipt.into_tx_hash().map_err(LedgerError::decode)
}

fn parse_balance(body: &[u8]) -> Result<Money, LedgerError> {
    let balance: BalanceDto = serde_json::from_slice(body)
        .map_err(|err| LedgerError::decode(format!("invalid balance payload: {err}")))?;
    balance.into_money().map_err(LedgerError::decode)
}

fn map_transport_error(error: reqwest::Error) -> LedgerError {
    if error.is_timeout() {
        LedgerError::timeout(error.to_string())
    } else if error.is_decode() {
        LedgerError::decode(error.to_string())
    } else {
        LedgerError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> LedgerError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    };

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => LedgerError::timeout(message),
        _ if status.is_client_error() => LedgerError::rejected(message),
        _ => LedgerError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        let preview: String = compact.chars().take(PREVIEW_CHAR_LIMIT).collect();
        format!("{preview}...")
    } else {
        compact
    }
}
