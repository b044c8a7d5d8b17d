//! Payout request endpoints.
//!
//! ```text
//! POST /api/v1/groups/{groupId}/payout-requests   {"recipientId":"...","amount":"300.0","round":1}
//! GET  /api/v1/groups/{groupId}/payout-requests
//! POST /api/v1/payout-requests/{requestId}/votes  {"approve":true}
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{CreatePayoutRequest, PayoutRequestId, VoteOutcome};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::dto::{PayoutRequestResponse, TallyResponse};
use crate::inbound::http::groups::group_id;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, parse_money};

/// Payout proposal.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayoutBody {
    pub recipient_id: String,
    #[schema(example = "300.0")]
    pub amount: String,
    /// Must be the group's current round.
    pub round: u32,
}

/// Admin vote.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteBody {
    pub approve: bool,
}

/// Vote result with the request after any transition.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub request: PayoutRequestResponse,
    #[schema(example = "still_pending")]
    pub outcome: String,
    pub tally: TallyResponse,
}

fn outcome_label(outcome: VoteOutcome) -> &'static str {
    match outcome {
        VoteOutcome::StillPending => "still_pending",
        VoteOutcome::Approved => "approved",
        VoteOutcome::Rejected => "rejected",
    }
}

/// Propose a payout for the group's current round.
#[utoipa::path(
    post,
    path = "/api/v1/groups/{groupId}/payout-requests",
    params(("groupId" = String, Path, description = "Group identifier")),
    request_body = CreatePayoutBody,
    responses(
        (status = 201, description = "Request pending approval", body = PayoutRequestResponse),
        (status = 400, description = "Invalid amount or recipient", body = ErrorSchema),
        (status = 403, description = "Admins only", body = ErrorSchema),
        (status = 409, description = "Outstanding request for this round", body = ErrorSchema),
        (status = 422, description = "Wrong round, inactive group or low balance", body = ErrorSchema)
    ),
    tags = ["payouts"],
    operation_id = "createPayoutRequest"
)]
#[post("/groups/{group_id}/payout-requests")]
pub async fn create_payout_request(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<CreatePayoutBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_user_id()?;
    let body = payload.into_inner();
    let request = CreatePayoutRequest {
        group_id: group_id(&path)?,
        actor,
        recipient_id: parse_id(&body.recipient_id, FieldName::new("recipientId"))?,
        amount: parse_money(&body.amount, FieldName::new("amount"))?,
        round: body.round,
    };
    let payout = state.payouts.create_payout_request(request).await?;
    Ok(HttpResponse::Created().json(PayoutRequestResponse::from(payout)))
}

/// Payout requests of the group, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/groups/{groupId}/payout-requests",
    params(("groupId" = String, Path, description = "Group identifier")),
    responses(
        (status = 200, description = "Requests with votes", body = [PayoutRequestResponse]),
        (status = 403, description = "Members only", body = ErrorSchema)
    ),
    tags = ["payouts"],
    operation_id = "listPayoutRequests"
)]
#[get("/groups/{group_id}/payout-requests")]
pub async fn list_payout_requests(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<PayoutRequestResponse>>> {
    let actor = session.require_user_id()?;
    let requests = state
        .payouts
        .list_payout_requests(group_id(&path)?, actor)
        .await?;
    Ok(web::Json(requests.into_iter().map(Into::into).collect()))
}

/// Cast an admin vote; reaching the threshold executes the transfer.
#[utoipa::path(
    post,
    path = "/api/v1/payout-requests/{requestId}/votes",
    params(("requestId" = String, Path, description = "Payout request identifier")),
    request_body = VoteBody,
    responses(
        (status = 200, description = "Vote recorded", body = VoteResponse),
        (status = 403, description = "Admins only", body = ErrorSchema),
        (status = 404, description = "Unknown request", body = ErrorSchema),
        (status = 409, description = "Already voted", body = ErrorSchema),
        (status = 422, description = "Request no longer pending", body = ErrorSchema),
        (status = 502, description = "Payout transfer failed", body = ErrorSchema)
    ),
    tags = ["payouts"],
    operation_id = "votePayoutRequest"
)]
#[post("/payout-requests/{request_id}/votes")]
pub async fn vote_payout_request(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<VoteBody>,
) -> ApiResult<web::Json<VoteResponse>> {
    let actor = session.require_user_id()?;
    let request_id: PayoutRequestId = parse_id(&path, FieldName::new("requestId"))?;
    let receipt = state
        .payouts
        .record_vote(request_id, actor, payload.approve)
        .await?;
    Ok(web::Json(VoteResponse {
        request: receipt.request.into(),
        outcome: outcome_label(receipt.outcome).to_owned(),
        tally: receipt.tally.into(),
    }))
}
