//! PostgreSQL-backed `RoundLedgerRepository` implementation using Diesel ORM.
//!
//! Every write recomputes the round snapshot from a fresh read of the
//! contribution rows inside the same transaction, carrying the payout flags
//! of the previous snapshot forward. The snapshot row is created empty and
//! locked before the contributions are read, so concurrent writers for the
//! same round serialise on it even for the first contribution.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{RoundLedgerRepository, RoundLedgerRepositoryError};
use crate::domain::{
    ContributionStatus, GroupId, MemberStatus, Money, RoundContribution, RoundStatus,
    RoundStatusInput, UserId,
};

use super::diesel_basic_error_mapping::{
    TxError, map_basic_diesel_error, map_basic_pool_error, map_row_error, unique_violation,
};
use super::models::{ContributionRow, RoundStatusRow, RowError, to_db_int};
use super::pool::{DbPool, PoolError};
use super::schema::{group_members, round_contributions, round_statuses};

/// Diesel-backed implementation of the round ledger port.
#[derive(Clone)]
pub struct DieselRoundLedgerRepository {
    pool: DbPool,
}

impl DieselRoundLedgerRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

type TxResult<T> = Result<T, TxError<RoundLedgerRepositoryError>>;

fn map_pool_error(error: PoolError) -> RoundLedgerRepositoryError {
    map_basic_pool_error(error, RoundLedgerRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> RoundLedgerRepositoryError {
    map_basic_diesel_error(
        error,
        RoundLedgerRepositoryError::query,
        RoundLedgerRepositoryError::connection,
    )
}

fn map_row(error: RowError) -> RoundLedgerRepositoryError {
    map_row_error(error, RoundLedgerRepositoryError::query)
}

fn port<T>(result: Result<T, RowError>) -> TxResult<T> {
    result.map_err(|err| TxError::Port(map_row(err)))
}

async fn load_contributions(
    conn: &mut AsyncPgConnection,
    group_id: Uuid,
    round: i32,
) -> TxResult<Vec<RoundContribution>> {
    let rows: Vec<ContributionRow> = round_contributions::table
        .filter(round_contributions::group_id.eq(group_id))
        .filter(round_contributions::round.eq(round))
        .order((round_contributions::created_at.asc(), round_contributions::id.asc()))
        .select(ContributionRow::as_select())
        .load(conn)
        .await?;
    port(rows.into_iter().map(RoundContribution::try_from).collect())
}

/// Make sure a snapshot row exists for `(group, round)` and lock it.
///
/// `SELECT ... FOR UPDATE` locks nothing when the row is absent, so an empty
/// row is inserted first; a concurrent inserter blocks on the conflict until
/// the winner commits.
async fn lock_status_row(
    conn: &mut AsyncPgConnection,
    group: Uuid,
    db_round: i32,
    updated_at: DateTime<Utc>,
) -> TxResult<RoundStatusRow> {
    diesel::insert_into(round_statuses::table)
        .values(&RoundStatusRow::empty(group, db_round, updated_at))
        .on_conflict((round_statuses::group_id, round_statuses::round))
        .do_nothing()
        .execute(conn)
        .await?;
    let row = round_statuses::table
        .filter(round_statuses::group_id.eq(group))
        .filter(round_statuses::round.eq(db_round))
        .select(RoundStatusRow::as_select())
        .for_update()
        .first::<RoundStatusRow>(conn)
        .await?;
    Ok(row)
}

/// Recompute and upsert the snapshot for `(group, round)`.
async fn recompute_status(
    conn: &mut AsyncPgConnection,
    group_id: GroupId,
    round: u32,
    contribution_amount: Money,
    updated_at: DateTime<Utc>,
) -> TxResult<RoundStatus> {
    let group = *group_id.as_uuid();
    let db_round = port(to_db_int(round, "round"))?;
    let previous = lock_status_row(conn, group, db_round, updated_at).await?;
    let flags = port(RoundStatus::try_from(previous))?.flags();

    let approved: i64 = group_members::table
        .filter(group_members::group_id.eq(group))
        .filter(group_members::status.eq(MemberStatus::Approved.as_str()))
        .count()
        .get_result(conn)
        .await?;
    let required_count =
        port(u32::try_from(approved).map_err(|err| RowError::new("required_count", err)))?;

    let contributions = load_contributions(conn, group, db_round).await?;
    let status = RoundStatus::recompute(
        RoundStatusInput {
            group_id,
            round,
            contribution_amount,
            required_count,
            flags,
        },
        &contributions,
    )
    .map_err(|err| TxError::Port(RoundLedgerRepositoryError::query(err.to_string())))?;

    let row = port(RoundStatusRow::from_status(&status, updated_at))?;
    diesel::insert_into(round_statuses::table)
        .values(&row)
        .on_conflict((round_statuses::group_id, round_statuses::round))
        .do_update()
        .set(&row)
        .execute(conn)
        .await?;
    Ok(status)
}

#[async_trait]
impl RoundLedgerRepository for DieselRoundLedgerRepository {
    async fn find_confirmed(
        &self,
        group_id: GroupId,
        user_id: UserId,
        round: u32,
    ) -> Result<Option<RoundContribution>, RoundLedgerRepositoryError> {
        let round = to_db_int(round, "round").map_err(map_row)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = round_contributions::table
            .filter(round_contributions::group_id.eq(group_id.as_uuid()))
            .filter(round_contributions::user_id.eq(user_id.as_uuid()))
            .filter(round_contributions::round.eq(round))
            .filter(round_contributions::status.eq(ContributionStatus::Confirmed.as_str()))
            .select(ContributionRow::as_select())
            .first::<ContributionRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(RoundContribution::try_from)
            .transpose()
            .map_err(map_row)
    }

    async fn record_contribution(
        &self,
        contribution: &RoundContribution,
        contribution_amount: Money,
    ) -> Result<RoundStatus, RoundLedgerRepositoryError> {
        let row = ContributionRow::try_from(contribution).map_err(map_row)?;
        let group_id = contribution.group_id;
        let round = contribution.round;
        let updated_at = contribution.created_at;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction::<_, TxError<RoundLedgerRepositoryError>, _>(|conn| {
            async move {
                diesel::insert_into(round_contributions::table)
                    .values(&row)
                    .execute(conn)
                    .await
                    .map_err(|err| {
                        if unique_violation(&err).is_some() {
                            TxError::Port(RoundLedgerRepositoryError::duplicate_contribution())
                        } else {
                            TxError::Diesel(err)
                        }
                    })?;
                recompute_status(conn, group_id, round, contribution_amount, updated_at).await
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| err.into_port(map_diesel_error))
    }

    async fn contributions(
        &self,
        group_id: GroupId,
        round: u32,
    ) -> Result<Vec<RoundContribution>, RoundLedgerRepositoryError> {
        let round = to_db_int(round, "round").map_err(map_row)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        load_contributions(&mut conn, *group_id.as_uuid(), round)
            .await
            .map_err(|err| err.into_port(map_diesel_error))
    }

    async fn round_status(
        &self,
        group_id: GroupId,
        round: u32,
    ) -> Result<Option<RoundStatus>, RoundLedgerRepositoryError> {
        let round = to_db_int(round, "round").map_err(map_row)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = round_statuses::table
            .filter(round_statuses::group_id.eq(group_id.as_uuid()))
            .filter(round_statuses::round.eq(round))
            .select(RoundStatusRow::as_select())
            .first::<RoundStatusRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(RoundStatus::try_from).transpose().map_err(map_row)
    }

    async fn rebuild_status(
        &self,
        group_id: GroupId,
        round: u32,
        contribution_amount: Money,
        updated_at: DateTime<Utc>,
    ) -> Result<RoundStatus, RoundLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction::<_, TxError<RoundLedgerRepositoryError>, _>(|conn| {
            recompute_status(conn, group_id, round, contribution_amount, updated_at).scope_boxed()
        })
        .await
        .map_err(|err| err.into_port(map_diesel_error))
    }

    async fn authorize_payout(
        &self,
        group_id: GroupId,
        round: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<RoundStatus>, RoundLedgerRepositoryError> {
        let round = to_db_int(round, "round").map_err(map_row)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = diesel::update(
            round_statuses::table
                .filter(round_statuses::group_id.eq(group_id.as_uuid()))
                .filter(round_statuses::round.eq(round)),
        )
        .set((
            round_statuses::payout_authorized.eq(true),
            round_statuses::updated_at.eq(updated_at),
        ))
        .returning(RoundStatusRow::as_returning())
        .get_result::<RoundStatusRow>(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;

        row.map(RoundStatus::try_from).transpose().map_err(map_row)
    }
}
