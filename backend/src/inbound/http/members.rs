//! Membership endpoints.
//!
//! ```text
//! GET  /api/v1/groups/{groupId}/members
//! POST /api/v1/groups/{groupId}/members
//! POST /api/v1/groups/{groupId}/members/{userId}/review   {"approve":true}
//! POST /api/v1/groups/{groupId}/admin-nominations         {"nomineeId":"..."}
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{MemberReview, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::dto::MemberResponse;
use crate::inbound::http::groups::group_id;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

#[derive(Debug, Deserialize)]
pub(super) struct MemberPath {
    group_id: String,
    user_id: String,
}

/// Admin decision on a join request.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBody {
    /// `true` approves, `false` rejects.
    pub approve: bool,
}

/// Admin nomination payload.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NominationBody {
    pub nominee_id: String,
}

/// Outcome of an admin nomination.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NominationResponse {
    /// Distinct pending nominations for the nominee.
    pub nominations: usize,
    pub promoted: bool,
}

/// Every membership record of the group.
#[utoipa::path(
    get,
    path = "/api/v1/groups/{groupId}/members",
    params(("groupId" = String, Path, description = "Group identifier")),
    responses(
        (status = 200, description = "Members", body = [MemberResponse]),
        (status = 403, description = "Members only", body = ErrorSchema),
        (status = 404, description = "Unknown group", body = ErrorSchema)
    ),
    tags = ["members"],
    operation_id = "listMembers"
)]
#[get("/groups/{group_id}/members")]
pub async fn list_members(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<MemberResponse>>> {
    let actor = session.require_user_id()?;
    let members = state.members.list_members(group_id(&path)?, actor).await?;
    Ok(web::Json(members.into_iter().map(Into::into).collect()))
}

/// Ask to join the group.
#[utoipa::path(
    post,
    path = "/api/v1/groups/{groupId}/members",
    params(("groupId" = String, Path, description = "Group identifier")),
    responses(
        (status = 201, description = "Join request pending", body = MemberResponse),
        (status = 409, description = "Already a member or pending", body = ErrorSchema),
        (status = 422, description = "Group is full", body = ErrorSchema)
    ),
    tags = ["members"],
    operation_id = "joinGroup"
)]
#[post("/groups/{group_id}/members")]
pub async fn join_group(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_user_id()?;
    let member = state.members.join_group(group_id(&path)?, actor).await?;
    Ok(HttpResponse::Created().json(MemberResponse::from(member)))
}

/// Approve or reject a pending join request.
#[utoipa::path(
    post,
    path = "/api/v1/groups/{groupId}/members/{userId}/review",
    params(
        ("groupId" = String, Path, description = "Group identifier"),
        ("userId" = String, Path, description = "Applicant")
    ),
    request_body = ReviewBody,
    responses(
        (status = 200, description = "Membership updated", body = MemberResponse),
        (status = 403, description = "Admins only", body = ErrorSchema),
        (status = 404, description = "Unknown applicant", body = ErrorSchema),
        (status = 422, description = "Already reviewed or group full", body = ErrorSchema)
    ),
    tags = ["members"],
    operation_id = "reviewMember"
)]
#[post("/groups/{group_id}/members/{user_id}/review")]
pub async fn review_member(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<MemberPath>,
    payload: web::Json<ReviewBody>,
) -> ApiResult<web::Json<MemberResponse>> {
    let actor = session.require_user_id()?;
    let review = MemberReview {
        group_id: group_id(&path.group_id)?,
        actor,
        user_id: parse_id(&path.user_id, FieldName::new("userId"))?,
        approve: payload.approve,
    };
    let member = state.members.review_member(review).await?;
    Ok(web::Json(member.into()))
}

/// Nominate an approved member for admin.
#[utoipa::path(
    post,
    path = "/api/v1/groups/{groupId}/admin-nominations",
    params(("groupId" = String, Path, description = "Group identifier")),
    request_body = NominationBody,
    responses(
        (status = 200, description = "Nomination recorded", body = NominationResponse),
        (status = 400, description = "Self-nomination", body = ErrorSchema),
        (status = 409, description = "Already nominated or already admin", body = ErrorSchema),
        (status = 422, description = "Nominee not approved", body = ErrorSchema)
    ),
    tags = ["members"],
    operation_id = "nominateAdmin"
)]
#[post("/groups/{group_id}/admin-nominations")]
pub async fn nominate_admin(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<NominationBody>,
) -> ApiResult<web::Json<NominationResponse>> {
    let actor = session.require_user_id()?;
    let nominee: UserId = parse_id(&payload.nominee_id, FieldName::new("nomineeId"))?;
    let outcome = state
        .members
        .nominate_admin(group_id(&path)?, actor, nominee)
        .await?;
    Ok(web::Json(NominationResponse {
        nominations: outcome.nominations,
        promoted: outcome.promoted,
    }))
}
