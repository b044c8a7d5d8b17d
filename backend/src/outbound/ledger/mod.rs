//! Ledger outbound adapters.
//!
//! A thin HTTP implementation of the `LedgerGateway` port talking to the
//! ledger collaborator service.

mod dto;
mod http_gateway;

pub use http_gateway::HttpLedgerGateway;
