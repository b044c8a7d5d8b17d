//! Notification store backed by PostgreSQL.
//!
//! Delivery to devices happens elsewhere; this adapter records the
//! notification and serves the user's inbox from the same table.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{NotificationError, NotificationInbox, NotificationSink};
use crate::domain::{InboxEntry, Notification, UserId};

use super::diesel_basic_error_mapping::{map_basic_pool_error, map_row_error};
use super::models::{NewNotificationRow, NotificationRow};
use super::pool::{DbPool, PoolError};
use super::schema::notifications;

/// Diesel-backed notification store.
#[derive(Clone)]
pub struct DieselNotificationSink {
    pool: DbPool,
}

impl DieselNotificationSink {
    /// Create a new sink with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> NotificationError {
    map_basic_pool_error(error, NotificationError::delivery)
}

fn map_query_error(error: diesel::result::Error) -> NotificationError {
    NotificationError::query(error.to_string())
}

#[async_trait]
impl NotificationSink for DieselNotificationSink {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(notifications::table)
            .values(&NewNotificationRow::from(notification))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| NotificationError::delivery(err.to_string()))
    }
}

#[async_trait]
impl NotificationInbox for DieselNotificationSink {
    async fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> Result<Vec<InboxEntry>, NotificationError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let mut query = notifications::table
            .filter(notifications::user_id.eq(user_id.as_uuid()))
            .order((notifications::created_at.desc(), notifications::id.desc()))
            .select(NotificationRow::as_select())
            .into_boxed();
        if unread_only {
            query = query.filter(notifications::is_read.eq(false));
        }
        let rows: Vec<NotificationRow> = query.load(&mut conn).await.map_err(map_query_error)?;

        rows.into_iter()
            .map(InboxEntry::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| map_row_error(err, NotificationError::query))
    }

    async fn mark_read(&self, user_id: UserId, id: i64) -> Result<bool, NotificationError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(
            notifications::table
                .filter(notifications::id.eq(id))
                .filter(notifications::user_id.eq(user_id.as_uuid())),
        )
        .set(notifications::is_read.eq(true))
        .execute(&mut conn)
        .await
        .map_err(map_query_error)?;

        Ok(updated > 0)
    }
}
