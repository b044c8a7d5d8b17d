//! PostgreSQL-backed `MemberRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{MemberRepository, MemberRepositoryError};
use crate::domain::{
    AdminNomination, GroupId, Invitation, InvitationId, InvitationStatus, Member, MemberRole,
    MemberStatus, NominationStatus, UserId,
};

use super::diesel_basic_error_mapping::{
    TxError, map_basic_diesel_error, map_basic_pool_error, map_row_error, unique_violation,
};
use super::models::{InvitationRow, MemberRow, NewNominationRow, NominationRow, RowError};
use super::pool::{DbPool, PoolError};
use super::schema::{admin_nominations, group_invitations, group_members};

/// Diesel-backed implementation of the membership repository port.
#[derive(Clone)]
pub struct DieselMemberRepository {
    pool: DbPool,
}

impl DieselMemberRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> MemberRepositoryError {
    map_basic_pool_error(error, MemberRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> MemberRepositoryError {
    map_basic_diesel_error(
        error,
        MemberRepositoryError::query,
        MemberRepositoryError::connection,
    )
}

fn map_row(error: RowError) -> MemberRepositoryError {
    map_row_error(error, MemberRepositoryError::query)
}

/// Move a pending invitation to `to`; `0` rows when it was already answered.
async fn answer_invitation(
    conn: &mut AsyncPgConnection,
    id: Uuid,
    to: InvitationStatus,
) -> Result<usize, diesel::result::Error> {
    diesel::update(
        group_invitations::table
            .filter(group_invitations::id.eq(id))
            .filter(group_invitations::status.eq(InvitationStatus::Pending.as_str())),
    )
    .set(group_invitations::status.eq(to.as_str()))
    .execute(conn)
    .await
}

#[async_trait]
impl MemberRepository for DieselMemberRepository {
    async fn add(&self, member: &Member) -> Result<(), MemberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(group_members::table)
            .values(&MemberRow::from(member))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| {
                if unique_violation(&err).is_some() {
                    MemberRepositoryError::duplicate_member()
                } else {
                    map_diesel_error(err)
                }
            })
    }

    async fn find(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<Option<Member>, MemberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = group_members::table
            .filter(group_members::group_id.eq(group_id.as_uuid()))
            .filter(group_members::user_id.eq(user_id.as_uuid()))
            .select(MemberRow::as_select())
            .first::<MemberRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(Member::try_from).transpose().map_err(map_row)
    }

    async fn list(
        &self,
        group_id: GroupId,
        status: Option<MemberStatus>,
    ) -> Result<Vec<Member>, MemberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let mut query = group_members::table
            .filter(group_members::group_id.eq(*group_id.as_uuid()))
            .into_boxed();
        if let Some(status) = status {
            query = query.filter(group_members::status.eq(status.as_str()));
        }
        let rows: Vec<MemberRow> = query
            .order((group_members::joined_at.asc(), group_members::user_id.asc()))
            .select(MemberRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(Member::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_row)
    }

    async fn set_status(
        &self,
        group_id: GroupId,
        user_id: UserId,
        status: MemberStatus,
    ) -> Result<(), MemberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(
            group_members::table
                .filter(group_members::group_id.eq(group_id.as_uuid()))
                .filter(group_members::user_id.eq(user_id.as_uuid())),
        )
        .set(group_members::status.eq(status.as_str()))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        if updated == 0 {
            return Err(MemberRepositoryError::missing_member());
        }
        Ok(())
    }

    async fn count_approved(&self, group_id: GroupId) -> Result<u32, MemberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let count: i64 = group_members::table
            .filter(group_members::group_id.eq(group_id.as_uuid()))
            .filter(group_members::status.eq(MemberStatus::Approved.as_str()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        u32::try_from(count).map_err(|err| MemberRepositoryError::query(err.to_string()))
    }

    async fn add_nomination(
        &self,
        nomination: &AdminNomination,
    ) -> Result<(), MemberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(admin_nominations::table)
            .values(&NewNominationRow::from(nomination))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| {
                if unique_violation(&err).is_some() {
                    MemberRepositoryError::duplicate_nomination()
                } else {
                    map_diesel_error(err)
                }
            })
    }

    async fn pending_nominations(
        &self,
        group_id: GroupId,
        nominee_id: UserId,
    ) -> Result<Vec<AdminNomination>, MemberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<NominationRow> = admin_nominations::table
            .filter(admin_nominations::group_id.eq(group_id.as_uuid()))
            .filter(admin_nominations::nominee_id.eq(nominee_id.as_uuid()))
            .filter(admin_nominations::status.eq(NominationStatus::Pending.as_str()))
            .order(admin_nominations::created_at.asc())
            .select(NominationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(AdminNomination::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_row)
    }

    async fn promote_to_admin(
        &self,
        group_id: GroupId,
        nominee_id: UserId,
    ) -> Result<(), MemberRepositoryError> {
        let group = *group_id.as_uuid();
        let nominee = *nominee_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction::<_, TxError<MemberRepositoryError>, _>(|conn| {
            async move {
                let promoted = diesel::update(
                    group_members::table
                        .filter(group_members::group_id.eq(group))
                        .filter(group_members::user_id.eq(nominee)),
                )
                .set(group_members::role.eq(MemberRole::Admin.as_str()))
                .execute(conn)
                .await?;
                if promoted == 0 {
                    return Err(TxError::Port(MemberRepositoryError::missing_member()));
                }
                diesel::update(
                    admin_nominations::table
                        .filter(admin_nominations::group_id.eq(group))
                        .filter(admin_nominations::nominee_id.eq(nominee))
                        .filter(admin_nominations::status.eq(NominationStatus::Pending.as_str())),
                )
                .set(admin_nominations::status.eq(NominationStatus::Approved.as_str()))
                .execute(conn)
                .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| err.into_port(map_diesel_error))
    }

    async fn add_invitation(&self, invitation: &Invitation) -> Result<(), MemberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(group_invitations::table)
            .values(&InvitationRow::from(invitation))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| match unique_violation(&err) {
                Some("group_invitations_pending_uniq") => {
                    MemberRepositoryError::duplicate_invitation()
                }
                _ => map_diesel_error(err),
            })
    }

    async fn find_invitation(
        &self,
        id: InvitationId,
    ) -> Result<Option<Invitation>, MemberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = group_invitations::table
            .filter(group_invitations::id.eq(id.as_uuid()))
            .select(InvitationRow::as_select())
            .first::<InvitationRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(Invitation::try_from).transpose().map_err(map_row)
    }

    async fn pending_invitations(
        &self,
        invitee_id: UserId,
    ) -> Result<Vec<Invitation>, MemberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<InvitationRow> = group_invitations::table
            .filter(group_invitations::invitee_id.eq(invitee_id.as_uuid()))
            .filter(group_invitations::status.eq(InvitationStatus::Pending.as_str()))
            .order((group_invitations::created_at.desc(), group_invitations::id.asc()))
            .select(InvitationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(Invitation::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_row)
    }

    async fn accept_invitation(
        &self,
        id: InvitationId,
        member: &Member,
    ) -> Result<bool, MemberRepositoryError> {
        let invitation = *id.as_uuid();
        let row = MemberRow::from(member);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction::<_, TxError<MemberRepositoryError>, _>(|conn| {
            async move {
                if answer_invitation(conn, invitation, InvitationStatus::Accepted).await? == 0 {
                    return Ok(false);
                }
                diesel::insert_into(group_members::table)
                    .values(&row)
                    .execute(conn)
                    .await
                    .map_err(|err| {
                        if unique_violation(&err).is_some() {
                            TxError::Port(MemberRepositoryError::duplicate_member())
                        } else {
                            TxError::Diesel(err)
                        }
                    })?;
                Ok(true)
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| err.into_port(map_diesel_error))
    }

    async fn reject_invitation(&self, id: InvitationId) -> Result<bool, MemberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = answer_invitation(&mut conn, *id.as_uuid(), InvitationStatus::Rejected)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }
}
