//! Round ledger endpoints.
//!
//! ```text
//! POST /api/v1/groups/{groupId}/rounds/{round}/contributions  {"amount":"100.0","signingRef":"..."}
//! GET  /api/v1/groups/{groupId}/rounds/{round}
//! POST /api/v1/groups/{groupId}/rounds/{round}/authorize-payout
//! POST /api/v1/groups/{groupId}/rounds/{round}/rebuild
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, RecordContributionRequest, SigningRef};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::dto::{
    ContributionResponse, MemberResponse, RoundReportResponse, RoundStatusResponse,
};
use crate::inbound::http::groups::group_id;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_money, require_round};

#[derive(Debug, Deserialize)]
pub(super) struct RoundPath {
    group_id: String,
    round: u32,
}

/// Contribution payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContributionBody {
    /// Must equal the group's contribution amount exactly.
    #[schema(example = "100.0")]
    pub amount: String,
    /// Ledger authorisation for debiting the caller's wallet. Never stored.
    #[schema(value_type = String)]
    pub signing_ref: SigningRef,
}

/// A contribution together with the recomputed round status.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContributionReceiptResponse {
    pub contribution: ContributionResponse,
    pub round_status: RoundStatusResponse,
}

/// Authorised round and its scheduled recipient.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundAuthorizationResponse {
    pub round_status: RoundStatusResponse,
    pub recipient: MemberResponse,
}

/// Pay the caller's contribution for a round.
#[utoipa::path(
    post,
    path = "/api/v1/groups/{groupId}/rounds/{round}/contributions",
    params(
        ("groupId" = String, Path, description = "Group identifier"),
        ("round" = u32, Path, description = "Round number, starting at 1")
    ),
    request_body = ContributionBody,
    responses(
        (status = 201, description = "Contribution recorded", body = ContributionReceiptResponse),
        (status = 400, description = "Amount mismatch or round out of range", body = ErrorSchema),
        (status = 403, description = "Members only", body = ErrorSchema),
        (status = 409, description = "Already contributed", body = ErrorSchema),
        (status = 422, description = "Group is not active", body = ErrorSchema),
        (status = 502, description = "Ledger transfer failed", body = ErrorSchema)
    ),
    tags = ["rounds"],
    operation_id = "recordContribution"
)]
#[post("/groups/{group_id}/rounds/{round}/contributions")]
pub async fn record_contribution(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<RoundPath>,
    payload: web::Json<ContributionBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_user_id()?;
    let ContributionBody {
        amount,
        signing_ref,
    } = payload.into_inner();
    if signing_ref.expose().trim().is_empty() {
        return Err(Error::invalid_request("signingRef must not be empty")
            .with_details(serde_json::json!({ "field": "signingRef", "code": "missing_field" })));
    }
    let request = RecordContributionRequest {
        group_id: group_id(&path.group_id)?,
        actor,
        round: require_round(path.round, FieldName::new("round"))?,
        amount: parse_money(&amount, FieldName::new("amount"))?,
        signing: signing_ref,
    };
    let receipt = state.rounds.record_contribution(request).await?;
    Ok(HttpResponse::Created().json(ContributionReceiptResponse {
        contribution: receipt.contribution.into(),
        round_status: receipt.status.into(),
    }))
}

/// Round status with each approved member's paid/unpaid line.
#[utoipa::path(
    get,
    path = "/api/v1/groups/{groupId}/rounds/{round}",
    params(
        ("groupId" = String, Path, description = "Group identifier"),
        ("round" = u32, Path, description = "Round number")
    ),
    responses(
        (status = 200, description = "Round report", body = RoundReportResponse),
        (status = 403, description = "Members only", body = ErrorSchema),
        (status = 422, description = "Group not activated", body = ErrorSchema)
    ),
    tags = ["rounds"],
    operation_id = "roundStatus"
)]
#[get("/groups/{group_id}/rounds/{round}")]
pub async fn round_status(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<RoundPath>,
) -> ApiResult<web::Json<RoundReportResponse>> {
    let actor = session.require_user_id()?;
    let round = require_round(path.round, FieldName::new("round"))?;
    let report = state
        .rounds
        .round_report(group_id(&path.group_id)?, actor, round)
        .await?;
    Ok(web::Json(report.into()))
}

/// Authorise the payout of a fully paid round.
#[utoipa::path(
    post,
    path = "/api/v1/groups/{groupId}/rounds/{round}/authorize-payout",
    params(
        ("groupId" = String, Path, description = "Group identifier"),
        ("round" = u32, Path, description = "Round number")
    ),
    responses(
        (status = 200, description = "Payout authorised", body = RoundAuthorizationResponse),
        (status = 403, description = "Admins only", body = ErrorSchema),
        (status = 422, description = "Round not fully paid", body = ErrorSchema)
    ),
    tags = ["rounds"],
    operation_id = "authorizeRoundPayout"
)]
#[post("/groups/{group_id}/rounds/{round}/authorize-payout")]
pub async fn authorize_round_payout(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<RoundPath>,
) -> ApiResult<web::Json<RoundAuthorizationResponse>> {
    let actor = session.require_user_id()?;
    let round = require_round(path.round, FieldName::new("round"))?;
    let authorization = state
        .rounds
        .authorize_round_payout(group_id(&path.group_id)?, actor, round)
        .await?;
    Ok(web::Json(RoundAuthorizationResponse {
        round_status: authorization.status.into(),
        recipient: authorization.recipient.into(),
    }))
}

/// Recompute a round's status from its confirmed contributions.
#[utoipa::path(
    post,
    path = "/api/v1/groups/{groupId}/rounds/{round}/rebuild",
    params(
        ("groupId" = String, Path, description = "Group identifier"),
        ("round" = u32, Path, description = "Round number")
    ),
    responses(
        (status = 200, description = "Status rebuilt", body = RoundStatusResponse),
        (status = 403, description = "Admins only", body = ErrorSchema)
    ),
    tags = ["rounds"],
    operation_id = "rebuildRoundStatus"
)]
#[post("/groups/{group_id}/rounds/{round}/rebuild")]
pub async fn rebuild_round_status(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<RoundPath>,
) -> ApiResult<web::Json<RoundStatusResponse>> {
    let actor = session.require_user_id()?;
    let round = require_round(path.round, FieldName::new("round"))?;
    let status = state
        .rounds
        .rebuild_round_status(group_id(&path.group_id)?, actor, round)
        .await?;
    Ok(web::Json(status.into()))
}
