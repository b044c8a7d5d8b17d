//! Shared Diesel error mapping for the chama repositories.

use tracing::debug;

use super::models::RowError;
use super::pool::PoolError;

/// Map pool errors into a repository-specific connection error constructor.
pub fn map_basic_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Name of the unique constraint a Diesel error violated, if any.
pub fn unique_violation(error: &diesel::result::Error) -> Option<&str> {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            Some(info.constraint_name().unwrap_or_default())
        }
        _ => None,
    }
}

/// Map common Diesel error variants into query/connection constructors.
///
/// `NotFound` and query-builder failures map to query errors; a closed or
/// refused connection maps to the connection constructor.
pub fn map_basic_diesel_error<E, Q, C>(error: diesel::result::Error, query: Q, connection: C) -> E
where
    Q: Fn(String) -> E,
    C: Fn(String) -> E,
{
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(%error, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => query("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => query("database query error".to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error".to_owned())
        }
        DieselError::DatabaseError(kind, info) => {
            query(format!("database error ({kind:?}): {}", info.message()))
        }
        other => query(other.to_string()),
    }
}

/// Map a row decoding failure into a query error.
pub fn map_row_error<E, Q>(error: RowError, query: Q) -> E
where
    Q: FnOnce(String) -> E,
{
    query(format!("row mapping failed: {error}"))
}

/// Carries either a Diesel error or a repository error out of a transaction.
///
/// `diesel-async` transactions require the closure error to implement
/// `From<diesel::result::Error>`; this wrapper lets the closure also return
/// domain-level port errors such as stale-state rejections.
#[derive(Debug)]
pub enum TxError<E> {
    /// Database failure that rolled the transaction back.
    Diesel(diesel::result::Error),
    /// Repository error raised deliberately inside the transaction.
    Port(E),
}

impl<E> From<diesel::result::Error> for TxError<E> {
    fn from(value: diesel::result::Error) -> Self {
        Self::Diesel(value)
    }
}

impl<E> TxError<E> {
    /// Collapse into the port error, mapping database failures with `map`.
    pub fn into_port(self, map: impl FnOnce(diesel::result::Error) -> E) -> E {
        match self {
            Self::Diesel(error) => map(error),
            Self::Port(error) => error,
        }
    }
}
