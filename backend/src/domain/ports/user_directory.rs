//! Port for the identity collaborator's user directory.

use async_trait::async_trait;

use crate::domain::{EmailAddress, UserId, UserIdentity};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user directory adapters.
    pub enum UserDirectoryError {
        /// Connection or pool failure.
        Connection { message: String } => "user directory connection failed: {message}",
        /// Query or row mapping failure.
        Query { message: String } => "user directory query failed: {message}",
        /// The email address is already registered.
        DuplicateEmail => "email address already registered",
    }
}

/// Registered user identities.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Store a new identity.
    async fn register(&self, identity: &UserIdentity) -> Result<(), UserDirectoryError>;

    /// Look up an identity.
    async fn find(&self, id: UserId) -> Result<Option<UserIdentity>, UserDirectoryError>;

    /// Look up an identity by its normalised email address.
    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserIdentity>, UserDirectoryError>;
}
