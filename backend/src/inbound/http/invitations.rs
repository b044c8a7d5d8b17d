//! Group invitation endpoints.
//!
//! ```text
//! POST /api/v1/groups/{groupId}/invitations   {"email":"..."}
//! GET  /api/v1/invitations
//! POST /api/v1/invitations/{invitationId}/accept
//! POST /api/v1/invitations/{invitationId}/reject
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, InvitationId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{InvitationResponse, MemberResponse};
use crate::inbound::http::groups::group_id;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_email, parse_id};

/// Invitation payload.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteBody {
    /// Email the invitee registered with.
    #[schema(example = "wanjiru@example.com")]
    pub email: String,
}

fn invitation_id(raw: &str) -> Result<InvitationId, Error> {
    parse_id(raw, FieldName::new("invitationId"))
}

/// Invite a registered user to the group.
#[utoipa::path(
    post,
    path = "/api/v1/groups/{groupId}/invitations",
    params(("groupId" = String, Path, description = "Group identifier")),
    request_body = InviteBody,
    responses(
        (status = 201, description = "Invitation issued", body = InvitationResponse),
        (status = 400, description = "Malformed email", body = ErrorSchema),
        (status = 403, description = "Admins only", body = ErrorSchema),
        (status = 404, description = "Unknown group or email", body = ErrorSchema),
        (status = 409, description = "Already a member or invited", body = ErrorSchema)
    ),
    tags = ["invitations"],
    operation_id = "inviteMember"
)]
#[post("/groups/{group_id}/invitations")]
pub async fn invite_member(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<InviteBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_user_id()?;
    let email = parse_email(&payload.email, FieldName::new("email"))?;
    let invitation = state
        .members
        .invite(group_id(&path)?, actor, email)
        .await?;
    Ok(HttpResponse::Created().json(InvitationResponse::from(invitation)))
}

/// Open invitations addressed to the current user.
#[utoipa::path(
    get,
    path = "/api/v1/invitations",
    responses(
        (status = 200, description = "Pending invitations", body = [InvitationResponse]),
        (status = 401, description = "Login required", body = ErrorSchema)
    ),
    tags = ["invitations"],
    operation_id = "listInvitations"
)]
#[get("/invitations")]
pub async fn list_invitations(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<InvitationResponse>>> {
    let actor = session.require_user_id()?;
    let invitations = state.members.list_invitations(actor).await?;
    Ok(web::Json(invitations.into_iter().map(Into::into).collect()))
}

/// Accept an invitation; the membership then awaits admin review.
#[utoipa::path(
    post,
    path = "/api/v1/invitations/{invitationId}/accept",
    params(("invitationId" = String, Path, description = "Invitation identifier")),
    responses(
        (status = 201, description = "Join request pending", body = MemberResponse),
        (status = 404, description = "Unknown invitation", body = ErrorSchema),
        (status = 409, description = "Already a member", body = ErrorSchema),
        (status = 422, description = "Answered, expired or group full", body = ErrorSchema)
    ),
    tags = ["invitations"],
    operation_id = "acceptInvitation"
)]
#[post("/invitations/{invitation_id}/accept")]
pub async fn accept_invitation(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_user_id()?;
    let member = state
        .members
        .accept_invitation(invitation_id(&path)?, actor)
        .await?;
    Ok(HttpResponse::Created().json(MemberResponse::from(member)))
}

/// Decline an invitation.
#[utoipa::path(
    post,
    path = "/api/v1/invitations/{invitationId}/reject",
    params(("invitationId" = String, Path, description = "Invitation identifier")),
    responses(
        (status = 200, description = "Invitation rejected", body = InvitationResponse),
        (status = 404, description = "Unknown invitation", body = ErrorSchema),
        (status = 422, description = "Already answered", body = ErrorSchema)
    ),
    tags = ["invitations"],
    operation_id = "rejectInvitation"
)]
#[post("/invitations/{invitation_id}/reject")]
pub async fn reject_invitation(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<InvitationResponse>> {
    let actor = session.require_user_id()?;
    let invitation = state
        .members
        .reject_invitation(invitation_id(&path)?, actor)
        .await?;
    Ok(web::Json(invitation.into()))
}
