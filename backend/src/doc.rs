//! OpenAPI documentation for the REST API.
//!
//! Served by Swagger UI in debug builds and printed by the `openapi-dump`
//! binary.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::dto::{
    ApprovalResponse, ContributionResponse, GroupResponse, InvitationResponse,
    MemberPaymentResponse, MemberResponse, NotificationResponse, PayoutRequestResponse,
    RoundReportResponse, RoundStatusResponse, ScheduleEntryResponse, TallyResponse, TermsResponse,
    UserResponse,
};
use crate::inbound::http::groups::{ActivateGroupBody, CreateGroupBody};
use crate::inbound::http::invitations::InviteBody;
use crate::inbound::http::members::{NominationBody, NominationResponse, ReviewBody};
use crate::inbound::http::payouts::{CreatePayoutBody, VoteBody, VoteResponse};
use crate::inbound::http::rounds::{
    ContributionBody, ContributionReceiptResponse, RoundAuthorizationResponse,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::users::RegisterUserBody;

/// Adds the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/users.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Chama backend API",
        description = "Rotating savings groups: membership, contribution rounds and approved payouts."
    ),
    servers((url = "/", description = "Relative to the deployment base URL")),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::users::register_user,
        crate::inbound::http::users::current_user,
        crate::inbound::http::groups::create_group,
        crate::inbound::http::groups::get_group,
        crate::inbound::http::groups::approve_group,
        crate::inbound::http::groups::activate_group,
        crate::inbound::http::groups::payout_schedule,
        crate::inbound::http::members::list_members,
        crate::inbound::http::members::join_group,
        crate::inbound::http::members::review_member,
        crate::inbound::http::members::nominate_admin,
        crate::inbound::http::invitations::invite_member,
        crate::inbound::http::invitations::list_invitations,
        crate::inbound::http::invitations::accept_invitation,
        crate::inbound::http::invitations::reject_invitation,
        crate::inbound::http::rounds::record_contribution,
        crate::inbound::http::rounds::round_status,
        crate::inbound::http::rounds::authorize_round_payout,
        crate::inbound::http::rounds::rebuild_round_status,
        crate::inbound::http::payouts::create_payout_request,
        crate::inbound::http::payouts::list_payout_requests,
        crate::inbound::http::payouts::vote_payout_request,
        crate::inbound::http::notifications::list_notifications,
        crate::inbound::http::notifications::mark_notification_read,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        RegisterUserBody,
        UserResponse,
        CreateGroupBody,
        ActivateGroupBody,
        GroupResponse,
        TermsResponse,
        ScheduleEntryResponse,
        MemberResponse,
        ReviewBody,
        NominationBody,
        NominationResponse,
        InviteBody,
        InvitationResponse,
        ContributionBody,
        ContributionResponse,
        ContributionReceiptResponse,
        RoundStatusResponse,
        RoundReportResponse,
        MemberPaymentResponse,
        RoundAuthorizationResponse,
        CreatePayoutBody,
        PayoutRequestResponse,
        ApprovalResponse,
        VoteBody,
        VoteResponse,
        TallyResponse,
        NotificationResponse,
    )),
    tags(
        (name = "users", description = "Identity registration and sessions"),
        (name = "groups", description = "Group lifecycle and payout schedule"),
        (name = "members", description = "Join requests, reviews and admin nomination"),
        (name = "rounds", description = "Contributions and round status"),
        (name = "invitations", description = "Admin invitations and their answers"),
        (name = "payouts", description = "Payout requests and admin votes"),
        (name = "notifications", description = "Per-user notification inbox"),
        (name = "health", description = "Liveness and readiness checks")
    )
)]
pub struct ApiDoc;
