//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Money columns
//! hold stroops (`BIGINT`); enumerations are stored as their text form.

diesel::table! {
    /// Registered identities.
    users (id) {
        id -> Uuid,
        display_name -> Varchar,
        email -> Varchar,
        wallet_address -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Savings groups with their activation terms.
    groups (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Text,
        creator_id -> Uuid,
        wallet_address -> Varchar,
        min_members -> Int4,
        max_members -> Int4,
        is_approved -> Bool,
        status -> Varchar,
        /// Fixed contribution in stroops; null until activation.
        contribution_stroops -> Nullable<Int8>,
        period_days -> Nullable<Int4>,
        payout_order -> Array<Uuid>,
        current_round -> Int4,
        next_contribution_date -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Membership records keyed by `(group_id, user_id)`.
    group_members (group_id, user_id) {
        group_id -> Uuid,
        user_id -> Uuid,
        wallet_address -> Varchar,
        role -> Varchar,
        status -> Varchar,
        joined_at -> Timestamptz,
    }
}

diesel::table! {
    admin_nominations (id) {
        id -> Int8,
        group_id -> Uuid,
        nominator_id -> Uuid,
        nominee_id -> Uuid,
        status -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Admin invitations addressed to registered users.
    group_invitations (id) {
        id -> Uuid,
        group_id -> Uuid,
        inviter_id -> Uuid,
        invitee_id -> Uuid,
        email -> Varchar,
        status -> Varchar,
        created_at -> Timestamptz,
        expires_at -> Timestamptz,
    }
}

diesel::table! {
    /// Contributions; at most one confirmed row per `(group, user, round)`.
    round_contributions (id) {
        id -> Uuid,
        group_id -> Uuid,
        user_id -> Uuid,
        round -> Int4,
        amount_stroops -> Int8,
        status -> Varchar,
        tx_hash -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Materialised round status snapshots.
    round_statuses (group_id, round) {
        group_id -> Uuid,
        round -> Int4,
        total_required_stroops -> Int8,
        total_received_stroops -> Int8,
        contributors_count -> Int4,
        required_count -> Int4,
        status -> Varchar,
        payout_authorized -> Bool,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Payout requests; at most one pending or approved per `(group, round)`.
    payout_requests (id) {
        id -> Uuid,
        group_id -> Uuid,
        recipient_id -> Uuid,
        amount_stroops -> Int8,
        round -> Int4,
        status -> Varchar,
        idempotency_token -> Uuid,
        tx_hash -> Nullable<Varchar>,
        created_by -> Uuid,
        created_at -> Timestamptz,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    payout_approvals (payout_request_id, admin_id) {
        payout_request_id -> Uuid,
        admin_id -> Uuid,
        approved -> Bool,
        voted_at -> Timestamptz,
    }
}

diesel::table! {
    payout_schedules (group_id, round) {
        group_id -> Uuid,
        round -> Int4,
        recipient_id -> Uuid,
        amount_stroops -> Int8,
        due_date -> Timestamptz,
        status -> Varchar,
        paid_at -> Nullable<Timestamptz>,
        tx_hash -> Nullable<Varchar>,
    }
}

diesel::table! {
    notifications (id) {
        id -> Int8,
        user_id -> Uuid,
        group_id -> Uuid,
        kind -> Varchar,
        title -> Varchar,
        message -> Text,
        is_read -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(group_members -> groups (group_id));
diesel::joinable!(group_invitations -> groups (group_id));
diesel::joinable!(round_contributions -> groups (group_id));
diesel::joinable!(round_statuses -> groups (group_id));
diesel::joinable!(payout_requests -> groups (group_id));
diesel::joinable!(payout_approvals -> payout_requests (payout_request_id));
diesel::joinable!(payout_schedules -> groups (group_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    groups,
    group_members,
    admin_nominations,
    group_invitations,
    round_contributions,
    round_statuses,
    payout_requests,
    payout_approvals,
    payout_schedules,
    notifications,
);
