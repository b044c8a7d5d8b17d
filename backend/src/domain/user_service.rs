//! Identity registration and lookup.

use std::sync::Arc;

use tracing::info;

use super::ports::{ServicePorts, UserDirectory};
use super::{DisplayName, EmailAddress, Error, UserId, UserIdentity, WalletAddress};

/// Validated registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUserRequest {
    /// Name shown to other members.
    pub display_name: DisplayName,
    /// Contact address; unique across users.
    pub email: EmailAddress,
    /// Ledger wallet used for contributions and payouts.
    pub wallet: WalletAddress,
}

/// Registers identities and resolves the current user.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserDirectory>,
}

impl UserService {
    /// Build the service from the shared port bundle.
    #[must_use]
    pub fn new(ports: &ServicePorts) -> Self {
        Self {
            users: Arc::clone(&ports.users),
        }
    }

    /// Register a new identity with a fresh id.
    ///
    /// # Errors
    /// `Conflict` when the email is already registered.
    pub async fn register(&self, request: RegisterUserRequest) -> Result<UserIdentity, Error> {
        let identity = UserIdentity {
            id: UserId::random(),
            display_name: request.display_name,
            email: request.email,
            wallet: request.wallet,
        };
        self.users.register(&identity).await?;
        info!(user_id = %identity.id, "user registered");
        Ok(identity)
    }

    /// Identity behind an authenticated session.
    ///
    /// # Errors
    /// `Unauthorized` when the session refers to an unknown user.
    pub async fn current(&self, user_id: UserId) -> Result<UserIdentity, Error> {
        self.users
            .find(user_id)
            .await?
            .ok_or_else(|| Error::unauthorized("session user no longer exists"))
    }
}
