//! Registered user identity: display name, email and ledger wallet.
//!
//! The identity collaborator vouches for who the caller is; the domain only
//! validates the shape of the values it stores.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::UserId;

/// Minimum allowed length for a display name.
pub const DISPLAY_NAME_MIN: usize = 2;
/// Maximum allowed length for a display name.
pub const DISPLAY_NAME_MAX: usize = 64;

/// Validation errors raised while building identity values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityValidationError {
    /// Display name empty once trimmed.
    #[error("display name must not be empty")]
    EmptyDisplayName,
    /// Display name outside the accepted length range.
    #[error("display name must be between {min} and {max} characters")]
    DisplayNameLength {
        /// Minimum length.
        min: usize,
        /// Maximum length.
        max: usize,
    },
    /// Email missing an `@` or a domain.
    #[error("email address is malformed")]
    InvalidEmail,
    /// Wallet address is not a ledger public key.
    #[error("wallet address must be a 56 character public key starting with G")]
    InvalidWallet,
}

static WALLET_RE: OnceLock<Regex> = OnceLock::new();
static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn wallet_regex() -> &'static Regex {
    WALLET_RE.get_or_init(|| {
        Regex::new("^G[A-Z2-7]{55}$")
            .unwrap_or_else(|error| panic!("wallet regex failed to compile: {error}"))
    })
}

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Ledger account public key (Stellar `G...` strkey form).
///
/// # Examples
/// ```
/// use chama_backend::domain::WalletAddress;
///
/// let wallet = WalletAddress::new("GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7")
///     .expect("valid key");
/// assert!(wallet.as_ref().starts_with('G'));
/// assert!(WalletAddress::new("not-a-wallet").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Validate and construct a wallet address.
    ///
    /// # Errors
    /// Returns [`IdentityValidationError::InvalidWallet`] when the value is not
    /// a `G` followed by 55 base32 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, IdentityValidationError> {
        let value = value.into();
        if wallet_regex().is_match(&value) {
            Ok(Self(value))
        } else {
            Err(IdentityValidationError::InvalidWallet)
        }
    }
}

impl AsRef<str> for WalletAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

/// Contact email for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and construct an email address. Surrounding whitespace is
    /// trimmed and the value is lower-cased.
    ///
    /// # Errors
    /// Returns [`IdentityValidationError::InvalidEmail`] for malformed input.
    pub fn new(value: impl AsRef<str>) -> Result<Self, IdentityValidationError> {
        let normalised = value.as_ref().trim().to_ascii_lowercase();
        if email_regex().is_match(&normalised) {
            Ok(Self(normalised))
        } else {
            Err(IdentityValidationError::InvalidEmail)
        }
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Human readable name shown to other group members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Validate and construct a display name.
    ///
    /// # Errors
    /// Returns an error for blank names or names outside
    /// [`DISPLAY_NAME_MIN`]..=[`DISPLAY_NAME_MAX`] characters.
    pub fn new(value: impl Into<String>) -> Result<Self, IdentityValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IdentityValidationError::EmptyDisplayName);
        }
        let length = trimmed.chars().count();
        if !(DISPLAY_NAME_MIN..=DISPLAY_NAME_MAX).contains(&length) {
            return Err(IdentityValidationError::DisplayNameLength {
                min: DISPLAY_NAME_MIN,
                max: DISPLAY_NAME_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

/// Authenticated user identity supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// Stable user identifier.
    pub id: UserId,
    /// Name shown to other members.
    pub display_name: DisplayName,
    /// Contact email.
    pub email: EmailAddress,
    /// Personal ledger wallet.
    pub wallet: WalletAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const VALID_WALLET: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";

    #[rstest]
    fn accepts_public_key() {
        assert!(WalletAddress::new(VALID_WALLET).is_ok());
    }

    #[rstest]
    #[case::secret_seed("SAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7")]
    #[case::lower_case("gaazi4tcr3ty5ojhctjc2a4qsy6cjwjh5iajtgkin2er7lbnvkoccwn7")]
    #[case::short("GAAZI4TCR3TY5")]
    #[case::invalid_digit("GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN1")]
    fn rejects_malformed_wallets(#[case] raw: &str) {
        assert_eq!(
            WalletAddress::new(raw),
            Err(IdentityValidationError::InvalidWallet)
        );
    }

    #[rstest]
    fn normalises_email() {
        let email = EmailAddress::new("  Wanjiru@Example.COM ").expect("valid email");
        assert_eq!(email.as_ref(), "wanjiru@example.com");
    }

    #[rstest]
    #[case("no-at-sign")]
    #[case("two@@example.com")]
    #[case("missing@tld")]
    fn rejects_bad_email(#[case] raw: &str) {
        assert_eq!(
            EmailAddress::new(raw),
            Err(IdentityValidationError::InvalidEmail)
        );
    }

    #[rstest]
    #[case("", IdentityValidationError::EmptyDisplayName)]
    #[case("A", IdentityValidationError::DisplayNameLength { min: DISPLAY_NAME_MIN, max: DISPLAY_NAME_MAX })]
    fn rejects_bad_display_names(#[case] raw: &str, #[case] expected: IdentityValidationError) {
        assert_eq!(DisplayName::new(raw), Err(expected));
    }

    #[rstest]
    fn deserialising_identity_validates_wallet() {
        let json = serde_json::json!({
            "id": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
            "displayName": "Amina",
            "email": "amina@example.com",
            "wallet": "bogus"
        });
        assert!(serde_json::from_value::<UserIdentity>(json).is_err());
    }
}
