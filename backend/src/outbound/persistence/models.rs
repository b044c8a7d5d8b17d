//! Internal Diesel row structs and their conversions to domain types.
//!
//! Rows are implementation details of the persistence layer and never leave
//! it. Decoding goes through validated domain constructors; a row that fails
//! validation surfaces as [`RowError`].

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    AdminNomination, ContributionId, ContributionStatus, ContributionTerms, DisplayName,
    EmailAddress, Group, GroupId, InboxEntry, Invitation, InvitationId, Member, Money,
    Notification, PayoutApproval, PayoutRequest, PayoutRequestId, PayoutScheduleEntry,
    RoundContribution, RoundPhase, RoundStatus, TxHash, UserId, UserIdentity, WalletAddress,
};

use super::schema::{
    admin_nominations, group_invitations, group_members, groups, notifications, payout_approvals,
    payout_requests, payout_schedules, round_contributions, round_statuses, users,
};

/// A stored row could not be turned into a domain value, or the reverse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub(crate) struct RowError(String);

impl RowError {
    pub(crate) fn new(context: &str, err: impl std::fmt::Display) -> Self {
        Self(format!("{context}: {err}"))
    }
}

pub(crate) fn to_db_int(value: u32, column: &str) -> Result<i32, RowError> {
    i32::try_from(value).map_err(|err| RowError::new(column, err))
}

pub(crate) fn from_db_int(value: i32, column: &str) -> Result<u32, RowError> {
    u32::try_from(value).map_err(|err| RowError::new(column, err))
}

pub(crate) fn from_db_money(stroops: i64, column: &str) -> Result<Money, RowError> {
    Money::from_stroops(stroops).map_err(|err| RowError::new(column, err))
}

fn parse_column<T>(value: String, column: &str) -> Result<T, RowError>
where
    T: TryFrom<String>,
    T::Error: std::fmt::Display,
{
    T::try_from(value).map_err(|err| RowError::new(column, err))
}

fn decode_hash(value: Option<String>) -> Result<Option<TxHash>, RowError> {
    value
        .map(|hash| TxHash::new(hash).map_err(|err| RowError::new("tx_hash", err)))
        .transpose()
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub wallet_address: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub display_name: &'a str,
    pub email: &'a str,
    pub wallet_address: &'a str,
}

impl<'a> From<&'a UserIdentity> for NewUserRow<'a> {
    fn from(identity: &'a UserIdentity) -> Self {
        Self {
            id: *identity.id.as_uuid(),
            display_name: identity.display_name.as_ref(),
            email: identity.email.as_ref(),
            wallet_address: identity.wallet.as_ref(),
        }
    }
}

impl TryFrom<UserRow> for UserIdentity {
    type Error = RowError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            display_name: DisplayName::new(row.display_name)
                .map_err(|err| RowError::new("display_name", err))?,
            email: EmailAddress::new(row.email).map_err(|err| RowError::new("email", err))?,
            wallet: parse_column::<WalletAddress>(row.wallet_address, "wallet_address")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Groups and members
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct GroupRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub creator_id: Uuid,
    pub wallet_address: String,
    pub min_members: i32,
    pub max_members: i32,
    pub is_approved: bool,
    pub status: String,
    pub contribution_stroops: Option<i64>,
    pub period_days: Option<i32>,
    pub payout_order: Vec<Uuid>,
    pub current_round: i32,
    pub next_contribution_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&Group> for GroupRow {
    type Error = RowError;

    fn try_from(group: &Group) -> Result<Self, Self::Error> {
        let (contribution_stroops, period_days, payout_order) = match &group.terms {
            Some(terms) => (
                Some(terms.contribution_amount.stroops()),
                Some(to_db_int(terms.period_days, "period_days")?),
                terms.payout_order.iter().map(|id| *id.as_uuid()).collect(),
            ),
            None => (None, None, Vec::new()),
        };
        Ok(Self {
            id: *group.id.as_uuid(),
            name: group.name.clone(),
            description: group.description.clone(),
            creator_id: *group.creator_id.as_uuid(),
            wallet_address: group.wallet.to_string(),
            min_members: to_db_int(group.min_members, "min_members")?,
            max_members: to_db_int(group.max_members, "max_members")?,
            is_approved: group.is_approved,
            status: group.status.as_str().to_owned(),
            contribution_stroops,
            period_days,
            payout_order,
            current_round: to_db_int(group.current_round, "current_round")?,
            next_contribution_date: group.next_contribution_date,
            created_at: group.created_at,
        })
    }
}

impl TryFrom<GroupRow> for Group {
    type Error = RowError;

    fn try_from(row: GroupRow) -> Result<Self, Self::Error> {
        let terms = match (row.contribution_stroops, row.period_days) {
            (Some(stroops), Some(period)) => Some(ContributionTerms {
                contribution_amount: from_db_money(stroops, "contribution_stroops")?,
                period_days: from_db_int(period, "period_days")?,
                payout_order: row.payout_order.into_iter().map(UserId::from_uuid).collect(),
            }),
            _ => None,
        };
        Ok(Self {
            id: GroupId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            creator_id: UserId::from_uuid(row.creator_id),
            wallet: parse_column(row.wallet_address, "wallet_address")?,
            min_members: from_db_int(row.min_members, "min_members")?,
            max_members: from_db_int(row.max_members, "max_members")?,
            is_approved: row.is_approved,
            status: parse_column(row.status, "status")?,
            terms,
            current_round: from_db_int(row.current_round, "current_round")?,
            next_contribution_date: row.next_contribution_date,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = group_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MemberRow {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub wallet_address: String,
    pub role: String,
    pub status: String,
    pub joined_at: DateTime<Utc>,
}

impl From<&Member> for MemberRow {
    fn from(member: &Member) -> Self {
        Self {
            group_id: *member.group_id.as_uuid(),
            user_id: *member.user_id.as_uuid(),
            wallet_address: member.wallet.to_string(),
            role: member.role.as_str().to_owned(),
            status: member.status.as_str().to_owned(),
            joined_at: member.joined_at,
        }
    }
}

impl TryFrom<MemberRow> for Member {
    type Error = RowError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(Self {
            group_id: GroupId::from_uuid(row.group_id),
            user_id: UserId::from_uuid(row.user_id),
            wallet: parse_column(row.wallet_address, "wallet_address")?,
            role: parse_column(row.role, "role")?,
            status: parse_column(row.status, "status")?,
            joined_at: row.joined_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = admin_nominations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct NominationRow {
    pub group_id: Uuid,
    pub nominator_id: Uuid,
    pub nominee_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = admin_nominations)]
pub(crate) struct NewNominationRow<'a> {
    pub group_id: Uuid,
    pub nominator_id: Uuid,
    pub nominee_id: Uuid,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a AdminNomination> for NewNominationRow<'a> {
    fn from(nomination: &'a AdminNomination) -> Self {
        Self {
            group_id: *nomination.group_id.as_uuid(),
            nominator_id: *nomination.nominator_id.as_uuid(),
            nominee_id: *nomination.nominee_id.as_uuid(),
            status: nomination.status.as_str(),
            created_at: nomination.created_at,
        }
    }
}

impl TryFrom<NominationRow> for AdminNomination {
    type Error = RowError;

    fn try_from(row: NominationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            group_id: GroupId::from_uuid(row.group_id),
            nominator_id: UserId::from_uuid(row.nominator_id),
            nominee_id: UserId::from_uuid(row.nominee_id),
            status: parse_column(row.status, "status")?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = group_invitations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct InvitationRow {
    pub id: Uuid,
    pub group_id: Uuid,
    pub inviter_id: Uuid,
    pub invitee_id: Uuid,
    pub email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Invitation> for InvitationRow {
    fn from(invitation: &Invitation) -> Self {
        Self {
            id: *invitation.id.as_uuid(),
            group_id: *invitation.group_id.as_uuid(),
            inviter_id: *invitation.inviter_id.as_uuid(),
            invitee_id: *invitation.invitee_id.as_uuid(),
            email: invitation.email.as_ref().to_owned(),
            status: invitation.status.as_str().to_owned(),
            created_at: invitation.created_at,
            expires_at: invitation.expires_at,
        }
    }
}

impl TryFrom<InvitationRow> for Invitation {
    type Error = RowError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: InvitationId::from_uuid(row.id),
            group_id: GroupId::from_uuid(row.group_id),
            inviter_id: UserId::from_uuid(row.inviter_id),
            invitee_id: UserId::from_uuid(row.invitee_id),
            email: parse_column(row.email, "email")?,
            status: parse_column(row.status, "status")?,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Rounds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = round_contributions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ContributionRow {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub round: i32,
    pub amount_stroops: i64,
    pub status: String,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&RoundContribution> for ContributionRow {
    type Error = RowError;

    fn try_from(contribution: &RoundContribution) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *contribution.id.as_uuid(),
            group_id: *contribution.group_id.as_uuid(),
            user_id: *contribution.user_id.as_uuid(),
            round: to_db_int(contribution.round, "round")?,
            amount_stroops: contribution.amount.stroops(),
            status: contribution.status.as_str().to_owned(),
            tx_hash: contribution.tx_hash.as_ref().map(ToString::to_string),
            created_at: contribution.created_at,
        })
    }
}

impl TryFrom<ContributionRow> for RoundContribution {
    type Error = RowError;

    fn try_from(row: ContributionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ContributionId::from_uuid(row.id),
            group_id: GroupId::from_uuid(row.group_id),
            user_id: UserId::from_uuid(row.user_id),
            round: from_db_int(row.round, "round")?,
            amount: from_db_money(row.amount_stroops, "amount_stroops")?,
            status: parse_column::<ContributionStatus>(row.status, "status")?,
            tx_hash: decode_hash(row.tx_hash)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = round_statuses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RoundStatusRow {
    pub group_id: Uuid,
    pub round: i32,
    pub total_required_stroops: i64,
    pub total_received_stroops: i64,
    pub contributors_count: i32,
    pub required_count: i32,
    pub status: String,
    pub payout_authorized: bool,
    pub updated_at: DateTime<Utc>,
}

impl RoundStatusRow {
    /// Zeroed `collecting` row used to take the snapshot lock.
    pub(crate) fn empty(group_id: Uuid, round: i32, updated_at: DateTime<Utc>) -> Self {
        Self {
            group_id,
            round,
            total_required_stroops: 0,
            total_received_stroops: 0,
            contributors_count: 0,
            required_count: 0,
            status: RoundPhase::Collecting.as_str().to_owned(),
            payout_authorized: false,
            updated_at,
        }
    }

    pub(crate) fn from_status(status: &RoundStatus, updated_at: DateTime<Utc>) -> Result<Self, RowError> {
        Ok(Self {
            group_id: *status.group_id.as_uuid(),
            round: to_db_int(status.round, "round")?,
            total_required_stroops: status.total_required.stroops(),
            total_received_stroops: status.total_received.stroops(),
            contributors_count: to_db_int(status.contributors_count, "contributors_count")?,
            required_count: to_db_int(status.required_count, "required_count")?,
            status: status.status.as_str().to_owned(),
            payout_authorized: status.payout_authorized,
            updated_at,
        })
    }
}

impl TryFrom<RoundStatusRow> for RoundStatus {
    type Error = RowError;

    fn try_from(row: RoundStatusRow) -> Result<Self, Self::Error> {
        Ok(Self {
            group_id: GroupId::from_uuid(row.group_id),
            round: from_db_int(row.round, "round")?,
            total_required: from_db_money(row.total_required_stroops, "total_required_stroops")?,
            total_received: from_db_money(row.total_received_stroops, "total_received_stroops")?,
            contributors_count: from_db_int(row.contributors_count, "contributors_count")?,
            required_count: from_db_int(row.required_count, "required_count")?,
            status: parse_column(row.status, "status")?,
            payout_authorized: row.payout_authorized,
        })
    }
}

// ---------------------------------------------------------------------------
// Payouts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = payout_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PayoutRequestRow {
    pub id: Uuid,
    pub group_id: Uuid,
    pub recipient_id: Uuid,
    pub amount_stroops: i64,
    pub round: i32,
    pub status: String,
    pub idempotency_token: Uuid,
    pub tx_hash: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<&PayoutRequest> for PayoutRequestRow {
    type Error = RowError;

    fn try_from(request: &PayoutRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *request.id.as_uuid(),
            group_id: *request.group_id.as_uuid(),
            recipient_id: *request.recipient_id.as_uuid(),
            amount_stroops: request.amount.stroops(),
            round: to_db_int(request.round, "round")?,
            status: request.status.as_str().to_owned(),
            idempotency_token: request.idempotency_token,
            tx_hash: request.tx_hash.as_ref().map(ToString::to_string),
            created_by: *request.created_by.as_uuid(),
            created_at: request.created_at,
            completed_at: None,
        })
    }
}

impl PayoutRequestRow {
    /// Decode the row, attaching its votes.
    pub(crate) fn into_domain(self, approvals: Vec<PayoutApproval>) -> Result<PayoutRequest, RowError> {
        Ok(PayoutRequest {
            id: PayoutRequestId::from_uuid(self.id),
            group_id: GroupId::from_uuid(self.group_id),
            recipient_id: UserId::from_uuid(self.recipient_id),
            amount: from_db_money(self.amount_stroops, "amount_stroops")?,
            round: from_db_int(self.round, "round")?,
            status: parse_column(self.status, "status")?,
            idempotency_token: self.idempotency_token,
            tx_hash: decode_hash(self.tx_hash)?,
            created_by: UserId::from_uuid(self.created_by),
            created_at: self.created_at,
            approvals,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = payout_approvals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ApprovalRow {
    pub payout_request_id: Uuid,
    pub admin_id: Uuid,
    pub approved: bool,
    pub voted_at: DateTime<Utc>,
}

impl From<&PayoutApproval> for ApprovalRow {
    fn from(vote: &PayoutApproval) -> Self {
        Self {
            payout_request_id: *vote.request_id.as_uuid(),
            admin_id: *vote.admin_id.as_uuid(),
            approved: vote.approved,
            voted_at: vote.voted_at,
        }
    }
}

impl From<ApprovalRow> for PayoutApproval {
    fn from(row: ApprovalRow) -> Self {
        Self {
            request_id: PayoutRequestId::from_uuid(row.payout_request_id),
            admin_id: UserId::from_uuid(row.admin_id),
            approved: row.approved,
            voted_at: row.voted_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = payout_schedules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ScheduleRow {
    pub group_id: Uuid,
    pub round: i32,
    pub recipient_id: Uuid,
    pub amount_stroops: i64,
    pub due_date: DateTime<Utc>,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub tx_hash: Option<String>,
}

impl TryFrom<&PayoutScheduleEntry> for ScheduleRow {
    type Error = RowError;

    fn try_from(entry: &PayoutScheduleEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            group_id: *entry.group_id.as_uuid(),
            round: to_db_int(entry.round, "round")?,
            recipient_id: *entry.recipient_id.as_uuid(),
            amount_stroops: entry.amount.stroops(),
            due_date: entry.due_date,
            status: entry.status.as_str().to_owned(),
            paid_at: entry.paid_at,
            tx_hash: entry.tx_hash.as_ref().map(ToString::to_string),
        })
    }
}

impl TryFrom<ScheduleRow> for PayoutScheduleEntry {
    type Error = RowError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            group_id: GroupId::from_uuid(row.group_id),
            round: from_db_int(row.round, "round")?,
            recipient_id: UserId::from_uuid(row.recipient_id),
            amount: from_db_money(row.amount_stroops, "amount_stroops")?,
            due_date: row.due_date,
            status: parse_column(row.status, "status")?,
            paid_at: row.paid_at,
            tx_hash: decode_hash(row.tx_hash)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notifications)]
pub(crate) struct NewNotificationRow<'a> {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub kind: &'a str,
    pub title: &'a str,
    pub message: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct NotificationRow {
    pub id: i64,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for InboxEntry {
    type Error = RowError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            notification: Notification {
                user_id: UserId::from_uuid(row.user_id),
                group_id: GroupId::from_uuid(row.group_id),
                kind: parse_column(row.kind, "kind")?,
                title: row.title,
                message: row.message,
            },
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

impl<'a> From<&'a Notification> for NewNotificationRow<'a> {
    fn from(notification: &'a Notification) -> Self {
        Self {
            user_id: *notification.user_id.as_uuid(),
            group_id: *notification.group_id.as_uuid(),
            kind: notification.kind.as_str(),
            title: &notification.title,
            message: &notification.message,
        }
    }
}
