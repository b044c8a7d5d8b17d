//! Translation of port errors into domain errors.
//!
//! Connection failures become `ServiceUnavailable`, query failures become
//! `InternalError`, uniqueness violations become `Conflict` and every ledger
//! failure becomes `ExternalFailure`.

use serde_json::json;
use tracing::error;

use super::Error;
use super::ports::{
    GroupRepositoryError, LedgerError, MemberRepositoryError, NotificationError,
    PayoutRepositoryError, RoundLedgerRepositoryError, UserDirectoryError,
};

fn unavailable(port: &str, message: &str) -> Error {
    error!(port, %message, "repository connection failed");
    Error::service_unavailable(format!("{port} unavailable"))
}

fn query_failed(port: &str, message: &str) -> Error {
    error!(port, %message, "repository query failed");
    Error::internal(format!("{port} error: {message}"))
}

impl From<GroupRepositoryError> for Error {
    fn from(value: GroupRepositoryError) -> Self {
        match value {
            GroupRepositoryError::Connection { message } => unavailable("group repository", &message),
            GroupRepositoryError::Query { message } => query_failed("group repository", &message),
            GroupRepositoryError::StaleState { message } => Self::conflict(message),
        }
    }
}

impl From<MemberRepositoryError> for Error {
    fn from(value: MemberRepositoryError) -> Self {
        match value {
            MemberRepositoryError::Connection { message } => {
                unavailable("member repository", &message)
            }
            MemberRepositoryError::Query { message } => query_failed("member repository", &message),
            MemberRepositoryError::DuplicateMember => Self::conflict("already a member"),
            MemberRepositoryError::DuplicateNomination => {
                Self::conflict("you have already nominated this member")
            }
            MemberRepositoryError::MissingMember => Self::not_found("member not found"),
            MemberRepositoryError::DuplicateInvitation => {
                Self::conflict("an invitation to this group is already pending")
            }
        }
    }
}

impl From<RoundLedgerRepositoryError> for Error {
    fn from(value: RoundLedgerRepositoryError) -> Self {
        match value {
            RoundLedgerRepositoryError::Connection { message } => {
                unavailable("round ledger", &message)
            }
            RoundLedgerRepositoryError::Query { message } => query_failed("round ledger", &message),
            RoundLedgerRepositoryError::DuplicateContribution => {
                Self::conflict("already contributed for this round")
            }
        }
    }
}

impl From<PayoutRepositoryError> for Error {
    fn from(value: PayoutRepositoryError) -> Self {
        match value {
            PayoutRepositoryError::Connection { message } => {
                unavailable("payout repository", &message)
            }
            PayoutRepositoryError::Query { message } => query_failed("payout repository", &message),
            PayoutRepositoryError::OutstandingRequest => {
                Self::conflict("a payout request for this round is already pending")
            }
            PayoutRepositoryError::AlreadyVoted => {
                Self::conflict("you have already voted on this payout request")
            }
            PayoutRepositoryError::NotPending { status } => {
                Self::precondition_failed(format!("payout request is already {status}"))
            }
        }
    }
}

impl From<UserDirectoryError> for Error {
    fn from(value: UserDirectoryError) -> Self {
        match value {
            UserDirectoryError::Connection { message } => unavailable("user directory", &message),
            UserDirectoryError::Query { message } => query_failed("user directory", &message),
            UserDirectoryError::DuplicateEmail => Self::conflict("email address already registered"),
        }
    }
}

impl From<NotificationError> for Error {
    fn from(value: NotificationError) -> Self {
        match value {
            NotificationError::Delivery { message } => unavailable("notification inbox", &message),
            NotificationError::Query { message } => query_failed("notification inbox", &message),
        }
    }
}

impl From<LedgerError> for Error {
    fn from(value: LedgerError) -> Self {
        let retryable = value.is_retryable();
        Self::external_failure(value.to_string()).with_details(json!({ "retryable": retryable }))
    }
}
