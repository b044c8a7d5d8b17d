//! PostgreSQL-backed `GroupRepository` implementation using Diesel ORM.
//!
//! Group creation writes the creator membership in the same transaction and
//! activation is a conditional update guarded on the `pending` status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::domain::ports::{GroupActivation, GroupRepository, GroupRepositoryError};
use crate::domain::{Group, GroupId, GroupStatus, Member, PayoutScheduleEntry};

use super::diesel_basic_error_mapping::{
    TxError, map_basic_diesel_error, map_basic_pool_error, map_row_error,
};
use super::models::{GroupRow, MemberRow, RowError, ScheduleRow, to_db_int};
use super::pool::{DbPool, PoolError};
use super::schema::{group_members, groups, payout_schedules};

/// Diesel-backed implementation of the group repository port.
#[derive(Clone)]
pub struct DieselGroupRepository {
    pool: DbPool,
}

impl DieselGroupRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> GroupRepositoryError {
    map_basic_pool_error(error, GroupRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> GroupRepositoryError {
    map_basic_diesel_error(
        error,
        GroupRepositoryError::query,
        GroupRepositoryError::connection,
    )
}

fn map_row(error: RowError) -> GroupRepositoryError {
    map_row_error(error, GroupRepositoryError::query)
}

#[async_trait]
impl GroupRepository for DieselGroupRepository {
    async fn create(&self, group: &Group, creator: &Member) -> Result<(), GroupRepositoryError> {
        let group_row = GroupRow::try_from(group).map_err(map_row)?;
        let member_row = MemberRow::from(creator);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                diesel::insert_into(groups::table)
                    .values(&group_row)
                    .execute(conn)
                    .await?;
                diesel::insert_into(group_members::table)
                    .values(&member_row)
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn find_by_id(&self, id: GroupId) -> Result<Option<Group>, GroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = groups::table
            .filter(groups::id.eq(id.as_uuid()))
            .select(GroupRow::as_select())
            .first::<GroupRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(Group::try_from).transpose().map_err(map_row)
    }

    async fn mark_approved(&self, id: GroupId) -> Result<(), GroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::update(groups::table.filter(groups::id.eq(id.as_uuid())))
            .set(groups::is_approved.eq(true))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn activate(&self, activation: &GroupActivation) -> Result<(), GroupRepositoryError> {
        let group_id = *activation.group_id.as_uuid();
        let stroops = activation.terms.contribution_amount.stroops();
        let period = to_db_int(activation.terms.period_days, "period_days").map_err(map_row)?;
        let order: Vec<uuid::Uuid> = activation
            .terms
            .payout_order
            .iter()
            .map(|id| *id.as_uuid())
            .collect();
        let next_date = activation.next_contribution_date;
        let schedule = activation
            .schedule
            .iter()
            .map(ScheduleRow::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_row)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction::<_, TxError<GroupRepositoryError>, _>(|conn| {
            async move {
                let updated = diesel::update(
                    groups::table
                        .filter(groups::id.eq(group_id))
                        .filter(groups::status.eq(GroupStatus::Pending.as_str()))
                        .filter(groups::is_approved.eq(true)),
                )
                .set((
                    groups::status.eq(GroupStatus::Active.as_str()),
                    groups::contribution_stroops.eq(Some(stroops)),
                    groups::period_days.eq(Some(period)),
                    groups::payout_order.eq(&order),
                    groups::current_round.eq(1),
                    groups::next_contribution_date.eq(Some(next_date)),
                ))
                .execute(conn)
                .await?;
                if updated == 0 {
                    return Err(TxError::Port(GroupRepositoryError::stale_state(
                        "group is no longer pending",
                    )));
                }
                diesel::insert_into(payout_schedules::table)
                    .values(&schedule)
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| err.into_port(map_diesel_error))
    }

    async fn payout_schedule(
        &self,
        id: GroupId,
    ) -> Result<Vec<PayoutScheduleEntry>, GroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<ScheduleRow> = payout_schedules::table
            .filter(payout_schedules::group_id.eq(id.as_uuid()))
            .order(payout_schedules::round.asc())
            .select(ScheduleRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(PayoutScheduleEntry::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_row)
    }

    async fn list_due_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Group>, GroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<GroupRow> = groups::table
            .filter(groups::status.eq(GroupStatus::Active.as_str()))
            .filter(groups::next_contribution_date.le(cutoff))
            .order(groups::next_contribution_date.asc())
            .select(GroupRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(Group::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_row)
    }
}
