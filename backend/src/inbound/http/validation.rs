//! Shared validation helpers for inbound HTTP adapters.
//!
//! Request bodies carry plain strings; these helpers lift them into domain
//! values and report failures as `invalid_request` errors whose details name
//! the offending field.

use std::str::FromStr;

use serde_json::json;

use crate::domain::{
    DisplayName, EmailAddress, Error, IdentityValidationError, Money, WalletAddress,
};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidUuid,
    InvalidAmount,
    InvalidWallet,
    InvalidEmail,
    InvalidDisplayName,
    OutOfRange,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUuid => "invalid_uuid",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidWallet => "invalid_wallet",
            Self::InvalidEmail => "invalid_email",
            Self::InvalidDisplayName => "invalid_display_name",
            Self::OutOfRange => "out_of_range",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, code: ErrorCode, message: String, value: &str) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "value": value,
        "code": code.as_str(),
    }))
}

/// Parse a UUID-backed identifier.
pub(crate) fn parse_id<T: FromStr>(value: &str, field: FieldName) -> Result<T, Error> {
    value.parse().map_err(|_| {
        field_error(
            field,
            ErrorCode::InvalidUuid,
            format!("{} must be a valid UUID", field.as_str()),
            value,
        )
    })
}

/// Parse a list of identifiers, reporting the index of the first bad entry.
pub(crate) fn parse_id_list<T: FromStr>(values: &[String], field: FieldName) -> Result<Vec<T>, Error> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            value.parse().map_err(|_| {
                Error::invalid_request(format!("{} must contain valid UUIDs", field.as_str()))
                    .with_details(json!({
                        "field": field.as_str(),
                        "index": index,
                        "value": value,
                        "code": ErrorCode::InvalidUuid.as_str(),
                    }))
            })
        })
        .collect()
}

/// Parse a decimal amount such as `"100.5"`.
pub(crate) fn parse_money(value: &str, field: FieldName) -> Result<Money, Error> {
    value.parse::<Money>().map_err(|err| {
        field_error(
            field,
            ErrorCode::InvalidAmount,
            format!("{}: {err}", field.as_str()),
            value,
        )
    })
}

/// Parse a ledger wallet address.
pub(crate) fn parse_wallet(value: &str, field: FieldName) -> Result<WalletAddress, Error> {
    WalletAddress::new(value)
        .map_err(|err| identity_error(field, ErrorCode::InvalidWallet, &err, value))
}

pub(crate) fn parse_email(value: &str, field: FieldName) -> Result<EmailAddress, Error> {
    EmailAddress::new(value)
        .map_err(|err| identity_error(field, ErrorCode::InvalidEmail, &err, value))
}

pub(crate) fn parse_display_name(value: &str, field: FieldName) -> Result<DisplayName, Error> {
    DisplayName::new(value)
        .map_err(|err| identity_error(field, ErrorCode::InvalidDisplayName, &err, value))
}

/// Reject a round number of zero in a path.
pub(crate) fn require_round(round: u32, field: FieldName) -> Result<u32, Error> {
    if round == 0 {
        return Err(field_error(
            field,
            ErrorCode::OutOfRange,
            format!("{} must be at least 1", field.as_str()),
            "0",
        ));
    }
    Ok(round)
}

fn identity_error(
    field: FieldName,
    code: ErrorCode,
    err: &IdentityValidationError,
    value: &str,
) -> Error {
    field_error(field, code, err.to_string(), value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorCode as DomainCode, GroupId, UserId};
    use rstest::rstest;
    use serde_json::Value;

    fn details(error: &Error) -> &Value {
        error.details().expect("details present")
    }

    #[rstest]
    fn bad_uuid_names_the_field() {
        let err = parse_id::<GroupId>("abc", FieldName::new("groupId")).expect_err("invalid");
        assert_eq!(err.code(), DomainCode::InvalidRequest);
        assert_eq!(details(&err)["field"], "groupId");
        assert_eq!(details(&err)["code"], "invalid_uuid");
        assert_eq!(details(&err)["value"], "abc");
    }

    #[rstest]
    fn id_list_reports_index() {
        let values = vec![UserId::random().to_string(), "nope".to_owned()];
        let err = parse_id_list::<UserId>(&values, FieldName::new("payoutOrder"))
            .expect_err("second entry invalid");
        assert_eq!(details(&err)["index"], 1);
    }

    #[rstest]
    #[case("100.0", 1_000_000_000)]
    #[case("0.0000001", 1)]
    fn amounts_parse_to_stroops(#[case] raw: &str, #[case] stroops: i64) {
        let money = parse_money(raw, FieldName::new("amount")).expect("valid amount");
        assert_eq!(money.stroops(), stroops);
    }

    #[rstest]
    #[case("")]
    #[case("-5")]
    #[case("1.00000001")]
    #[case("ten")]
    fn malformed_amounts_are_rejected(#[case] raw: &str) {
        let err = parse_money(raw, FieldName::new("amount")).expect_err("invalid amount");
        assert_eq!(details(&err)["code"], "invalid_amount");
    }

    #[rstest]
    fn wallet_errors_carry_code() {
        let err = parse_wallet("GABC", FieldName::new("wallet")).expect_err("short wallet");
        assert_eq!(details(&err)["code"], "invalid_wallet");
    }

    #[rstest]
    fn round_zero_is_out_of_range() {
        let err = require_round(0, FieldName::new("round")).expect_err("zero round");
        assert_eq!(details(&err)["code"], "out_of_range");
        assert_eq!(require_round(3, FieldName::new("round")).ok(), Some(3));
    }
}
