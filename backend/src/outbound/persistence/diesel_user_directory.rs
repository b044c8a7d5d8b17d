//! PostgreSQL-backed `UserDirectory` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{UserDirectory, UserDirectoryError};
use crate::domain::{EmailAddress, UserId, UserIdentity};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, map_row_error, unique_violation,
};
use super::models::{NewUserRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the user directory port.
#[derive(Clone)]
pub struct DieselUserDirectory {
    pool: DbPool,
}

impl DieselUserDirectory {
    /// Create a new directory with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserDirectoryError {
    map_basic_pool_error(error, UserDirectoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> UserDirectoryError {
    map_basic_diesel_error(error, UserDirectoryError::query, UserDirectoryError::connection)
}

#[async_trait]
impl UserDirectory for DieselUserDirectory {
    async fn register(&self, identity: &UserIdentity) -> Result<(), UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(users::table)
            .values(&NewUserRow::from(identity))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| match unique_violation(&err) {
                Some("users_email_key") => UserDirectoryError::duplicate_email(),
                _ => map_diesel_error(err),
            })
    }

    async fn find(&self, id: UserId) -> Result<Option<UserIdentity>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = users::table
            .filter(users::id.eq(id.as_uuid()))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(UserIdentity::try_from)
            .transpose()
            .map_err(|err| map_row_error(err, UserDirectoryError::query))
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserIdentity>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = users::table
            .filter(users::email.eq(email.as_ref()))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(UserIdentity::try_from)
            .transpose()
            .map_err(|err| map_row_error(err, UserDirectoryError::query))
    }
}
