//! Runtime configuration loaded via OrthoConfig.
//!
//! Values layer from defaults, an optional config file, `CHAMA_*`
//! environment variables and command-line flags.

use std::net::{Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::{ApprovalPolicy, DEFAULT_REMINDER_WINDOW_DAYS};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_LEDGER_TIMEOUT_SECS: u64 = 30;

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// `approval_threshold` was zero.
    #[error("approval_threshold must be at least 1")]
    ZeroApprovalThreshold,
    /// `ledger_url` did not parse.
    #[error("ledger_url is not a valid URL: {message}")]
    InvalidLedgerUrl { message: String },
}

/// Service configuration.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CHAMA")]
pub struct ChamaSettings {
    /// PostgreSQL connection string. Absent selects the in-memory store.
    pub database_url: Option<String>,
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<SocketAddr>,
    /// Maximum pooled database connections.
    pub db_max_connections: Option<u32>,
    /// Approvals required before a payout executes. Kept equal to
    /// [`DEFAULT_APPROVAL_THRESHOLD`](crate::domain::DEFAULT_APPROVAL_THRESHOLD).
    #[ortho_config(default = 2)]
    pub approval_threshold: u32,
    /// Base URL of the ledger service. Absent selects the fixture ledger.
    pub ledger_url: Option<String>,
    /// Ledger request timeout in seconds.
    pub ledger_timeout_secs: Option<u64>,
    /// Days ahead of a round deadline that reminders go out.
    pub reminder_window_days: Option<u32>,
}

impl ChamaSettings {
    /// Bind address, defaulting to `0.0.0.0:8080`.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)))
    }

    /// Configured database URL, if any.
    #[must_use]
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    /// Pool size, defaulting to ten.
    #[must_use]
    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
    }

    /// Payout approval policy.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::ZeroApprovalThreshold`] for a threshold of 0.
    pub fn approval_policy(&self) -> Result<ApprovalPolicy, SettingsError> {
        NonZeroU32::new(self.approval_threshold)
            .map(ApprovalPolicy::new)
            .ok_or(SettingsError::ZeroApprovalThreshold)
    }

    /// Parsed ledger base URL, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidLedgerUrl`] when the value is not a URL.
    pub fn ledger_url(&self) -> Result<Option<Url>, SettingsError> {
        self.ledger_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|err| SettingsError::InvalidLedgerUrl {
                    message: err.to_string(),
                })
            })
            .transpose()
    }

    /// Ledger request timeout.
    #[must_use]
    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_secs(
            self.ledger_timeout_secs
                .unwrap_or(DEFAULT_LEDGER_TIMEOUT_SECS),
        )
    }

    /// Reminder look-ahead window in days.
    #[must_use]
    pub fn reminder_window_days(&self) -> u32 {
        self.reminder_window_days
            .unwrap_or(DEFAULT_REMINDER_WINDOW_DAYS)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use crate::domain::DEFAULT_APPROVAL_THRESHOLD;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 7] = [
        "CHAMA_DATABASE_URL",
        "CHAMA_BIND_ADDR",
        "CHAMA_DB_MAX_CONNECTIONS",
        "CHAMA_APPROVAL_THRESHOLD",
        "CHAMA_LEDGER_URL",
        "CHAMA_LEDGER_TIMEOUT_SECS",
        "CHAMA_REMINDER_WINDOW_DAYS",
    ];

    fn load_from_empty_args() -> ChamaSettings {
        ChamaSettings::load_from_iter([OsString::from("chama-backend")])
            .expect("config should load")
    }

    fn cleared() -> Vec<(&'static str, Option<String>)> {
        VARS.iter().map(|name| (*name, None)).collect()
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(cleared());

        let settings = load_from_empty_args();
        assert_eq!(settings.bind_addr(), "0.0.0.0:8080".parse().expect("addr"));
        assert!(settings.database_url().is_none());
        assert_eq!(settings.db_max_connections(), 10);
        assert_eq!(settings.approval_policy().expect("policy").threshold(), 2);
        assert_eq!(settings.ledger_url().expect("url"), None);
        assert_eq!(settings.ledger_timeout(), Duration::from_secs(30));
        assert_eq!(settings.reminder_window_days(), 5);
    }

    #[rstest]
    fn threshold_default_matches_the_domain_default() {
        let _guard = lock_env(cleared());

        let settings = load_from_empty_args();
        assert_eq!(settings.approval_threshold, DEFAULT_APPROVAL_THRESHOLD);
        assert_eq!(
            ApprovalPolicy::default().threshold(),
            settings.approval_policy().expect("policy").threshold()
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let mut vars = cleared();
        vars.extend([
            ("CHAMA_DATABASE_URL", Some("postgres://db/chama".to_owned())),
            ("CHAMA_BIND_ADDR", Some("127.0.0.1:9000".to_owned())),
            ("CHAMA_APPROVAL_THRESHOLD", Some("3".to_owned())),
            ("CHAMA_LEDGER_URL", Some("https://ledger.test/v1".to_owned())),
            ("CHAMA_LEDGER_TIMEOUT_SECS", Some("5".to_owned())),
            ("CHAMA_REMINDER_WINDOW_DAYS", Some("2".to_owned())),
        ]);
        let _guard = lock_env(vars);

        let settings = load_from_empty_args();
        assert_eq!(settings.database_url(), Some("postgres://db/chama"));
        assert_eq!(settings.bind_addr(), "127.0.0.1:9000".parse().expect("addr"));
        assert_eq!(settings.approval_policy().expect("policy").threshold(), 3);
        assert_eq!(
            settings.ledger_url().expect("url").map(String::from),
            Some("https://ledger.test/v1".to_owned())
        );
        assert_eq!(settings.ledger_timeout(), Duration::from_secs(5));
        assert_eq!(settings.reminder_window_days(), 2);
    }

    #[rstest]
    fn zero_threshold_is_rejected() {
        let mut vars = cleared();
        vars.push(("CHAMA_APPROVAL_THRESHOLD", Some("0".to_owned())));
        let _guard = lock_env(vars);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.approval_policy(),
            Err(SettingsError::ZeroApprovalThreshold)
        );
    }

    #[rstest]
    fn malformed_ledger_url_is_rejected() {
        let mut vars = cleared();
        vars.push(("CHAMA_LEDGER_URL", Some("not a url".to_owned())));
        let _guard = lock_env(vars);

        let settings = load_from_empty_args();
        assert!(matches!(
            settings.ledger_url(),
            Err(SettingsError::InvalidLedgerUrl { .. })
        ));
    }
}
