//! PostgreSQL-backed `PayoutRepository` implementation using Diesel ORM.
//!
//! Completion is a single transaction: the request moves to `completed` only
//! while it is still `approved` with the submitted token, and the group,
//! schedule slot and round snapshot are updated alongside it.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{PayoutCompletion, PayoutRepository, PayoutRepositoryError};
use crate::domain::{
    GroupId, PayoutApproval, PayoutRequest, PayoutRequestId, PayoutStatus, RoundPhase,
    ScheduleStatus, VoteTally,
};

use super::diesel_basic_error_mapping::{
    TxError, map_basic_diesel_error, map_basic_pool_error, map_row_error, unique_violation,
};
use super::models::{ApprovalRow, PayoutRequestRow, RowError, to_db_int};
use super::pool::{DbPool, PoolError};
use super::schema::{groups, payout_approvals, payout_requests, payout_schedules, round_statuses};

const OUTSTANDING_CONSTRAINT: &str = "payout_requests_outstanding_uniq";

/// Diesel-backed implementation of the payout repository port.
#[derive(Clone)]
pub struct DieselPayoutRepository {
    pool: DbPool,
}

impl DieselPayoutRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> PayoutRepositoryError {
    map_basic_pool_error(error, PayoutRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> PayoutRepositoryError {
    map_basic_diesel_error(
        error,
        PayoutRepositoryError::query,
        PayoutRepositoryError::connection,
    )
}

fn map_row(error: RowError) -> PayoutRepositoryError {
    map_row_error(error, PayoutRepositoryError::query)
}

async fn load_approvals(
    conn: &mut AsyncPgConnection,
    request_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<PayoutApproval>>, diesel::result::Error> {
    let rows: Vec<ApprovalRow> = payout_approvals::table
        .filter(payout_approvals::payout_request_id.eq_any(request_ids))
        .order(payout_approvals::voted_at.asc())
        .select(ApprovalRow::as_select())
        .load(conn)
        .await?;

    let mut grouped: HashMap<Uuid, Vec<PayoutApproval>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.payout_request_id)
            .or_default()
            .push(PayoutApproval::from(row));
    }
    Ok(grouped)
}

#[async_trait]
impl PayoutRepository for DieselPayoutRepository {
    async fn create(&self, request: &PayoutRequest) -> Result<(), PayoutRepositoryError> {
        let row = PayoutRequestRow::try_from(request).map_err(map_row)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(payout_requests::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| match unique_violation(&err) {
                Some(OUTSTANDING_CONSTRAINT) => PayoutRepositoryError::outstanding_request(),
                _ => map_diesel_error(err),
            })
    }

    async fn find(
        &self,
        id: PayoutRequestId,
    ) -> Result<Option<PayoutRequest>, PayoutRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let Some(row) = payout_requests::table
            .filter(payout_requests::id.eq(id.as_uuid()))
            .select(PayoutRequestRow::as_select())
            .first::<PayoutRequestRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
        else {
            return Ok(None);
        };

        let mut approvals = load_approvals(&mut conn, &[row.id])
            .await
            .map_err(map_diesel_error)?;
        let votes = approvals.remove(&row.id).unwrap_or_default();
        row.into_domain(votes).map(Some).map_err(map_row)
    }

    async fn list_for_group(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<PayoutRequest>, PayoutRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<PayoutRequestRow> = payout_requests::table
            .filter(payout_requests::group_id.eq(group_id.as_uuid()))
            .order((payout_requests::created_at.desc(), payout_requests::id.desc()))
            .select(PayoutRequestRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut approvals = load_approvals(&mut conn, &ids)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(|row| {
                let votes = approvals.remove(&row.id).unwrap_or_default();
                row.into_domain(votes)
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_row)
    }

    async fn record_vote(&self, vote: &PayoutApproval) -> Result<VoteTally, PayoutRepositoryError> {
        let row = ApprovalRow::from(vote);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction::<_, TxError<PayoutRepositoryError>, _>(|conn| {
            async move {
                let status: String = payout_requests::table
                    .filter(payout_requests::id.eq(row.payout_request_id))
                    .select(payout_requests::status)
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| {
                        TxError::Port(PayoutRepositoryError::query("payout request not found"))
                    })?;
                if status != PayoutStatus::Pending.as_str() {
                    return Err(TxError::Port(PayoutRepositoryError::not_pending(status)));
                }
                diesel::insert_into(payout_approvals::table)
                    .values(&row)
                    .execute(conn)
                    .await
                    .map_err(|err| {
                        if unique_violation(&err).is_some() {
                            TxError::Port(PayoutRepositoryError::already_voted())
                        } else {
                            TxError::Diesel(err)
                        }
                    })?;
                let mut approvals = load_approvals(conn, &[row.payout_request_id]).await?;
                let votes = approvals
                    .remove(&row.payout_request_id)
                    .unwrap_or_default();
                Ok(VoteTally::from_votes(&votes))
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| err.into_port(map_diesel_error))
    }

    async fn transition(
        &self,
        id: PayoutRequestId,
        from: PayoutStatus,
        to: PayoutStatus,
    ) -> Result<bool, PayoutRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(
            payout_requests::table
                .filter(payout_requests::id.eq(id.as_uuid()))
                .filter(payout_requests::status.eq(from.as_str())),
        )
        .set(payout_requests::status.eq(to.as_str()))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(updated > 0)
    }

    async fn complete(&self, completion: &PayoutCompletion) -> Result<bool, PayoutRepositoryError> {
        let request_id = *completion.request_id.as_uuid();
        let token = completion.idempotency_token;
        let tx_hash = completion.tx_hash.to_string();
        let completed_at = completion.completed_at;
        let round = to_db_int(completion.round, "round").map_err(map_row)?;
        let advance = completion.advance.clone();
        let completed_round = to_db_int(advance.completed_round, "completed_round").map_err(map_row)?;
        let next_round = to_db_int(advance.next_round, "next_round").map_err(map_row)?;
        let group_id = *advance.group_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                let completed = diesel::update(
                    payout_requests::table
                        .filter(payout_requests::id.eq(request_id))
                        .filter(payout_requests::status.eq(PayoutStatus::Approved.as_str()))
                        .filter(payout_requests::idempotency_token.eq(token)),
                )
                .set((
                    payout_requests::status.eq(PayoutStatus::Completed.as_str()),
                    payout_requests::tx_hash.eq(Some(&tx_hash)),
                    payout_requests::completed_at.eq(Some(completed_at)),
                ))
                .execute(conn)
                .await?;
                if completed == 0 {
                    return Ok(false);
                }

                diesel::update(
                    groups::table
                        .filter(groups::id.eq(group_id))
                        .filter(groups::current_round.eq(completed_round)),
                )
                .set((
                    groups::current_round.eq(next_round),
                    groups::next_contribution_date.eq(advance.next_contribution_date),
                    groups::status.eq(advance.status.as_str()),
                ))
                .execute(conn)
                .await?;

                diesel::update(
                    payout_schedules::table
                        .filter(payout_schedules::group_id.eq(group_id))
                        .filter(payout_schedules::round.eq(round)),
                )
                .set((
                    payout_schedules::status.eq(ScheduleStatus::Paid.as_str()),
                    payout_schedules::paid_at.eq(Some(completed_at)),
                    payout_schedules::tx_hash.eq(Some(&tx_hash)),
                ))
                .execute(conn)
                .await?;

                diesel::update(
                    round_statuses::table
                        .filter(round_statuses::group_id.eq(group_id))
                        .filter(round_statuses::round.eq(round)),
                )
                .set((
                    round_statuses::status.eq(RoundPhase::Completed.as_str()),
                    round_statuses::updated_at.eq(completed_at),
                ))
                .execute(conn)
                .await?;

                Ok(true)
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }
}
