//! Group lifecycle endpoints.
//!
//! ```text
//! POST /api/v1/groups
//! GET  /api/v1/groups/{groupId}
//! POST /api/v1/groups/{groupId}/approve
//! POST /api/v1/groups/{groupId}/activate
//! GET  /api/v1/groups/{groupId}/payout-schedule
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ActivateGroupRequest, CreateGroupRequest, Error, GroupId, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::dto::{GroupResponse, ScheduleEntryResponse};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, parse_id_list, parse_money, parse_wallet};

const GROUP_ID: FieldName = FieldName::new("groupId");

/// Group creation payload.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupBody {
    #[schema(example = "Harambee")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Custodial wallet receiving contributions.
    pub wallet: String,
    pub min_members: Option<u32>,
    pub max_members: Option<u32>,
}

/// Activation payload fixing the contribution terms.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivateGroupBody {
    #[schema(example = "100.0")]
    pub contribution_amount: String,
    #[schema(example = 7)]
    pub period_days: u32,
    /// Every approved member exactly once, in payout order.
    pub payout_order: Vec<String>,
}

pub(super) fn group_id(raw: &str) -> Result<GroupId, Error> {
    parse_id(raw, GROUP_ID)
}

/// Create a pending group owned by the caller.
#[utoipa::path(
    post,
    path = "/api/v1/groups",
    request_body = CreateGroupBody,
    responses(
        (status = 201, description = "Group created", body = GroupResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Login required", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "createGroup"
)]
#[post("/groups")]
pub async fn create_group(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateGroupBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_user_id()?;
    let body = payload.into_inner();
    let request = CreateGroupRequest {
        actor,
        wallet: parse_wallet(&body.wallet, FieldName::new("wallet"))?,
        name: body.name,
        description: body.description,
        min_members: body.min_members,
        max_members: body.max_members,
    };
    let group = state.groups.create_group(request).await?;
    Ok(HttpResponse::Created().json(GroupResponse::from(group)))
}

/// Group detail.
#[utoipa::path(
    get,
    path = "/api/v1/groups/{groupId}",
    params(("groupId" = String, Path, description = "Group identifier")),
    responses(
        (status = 200, description = "Group", body = GroupResponse),
        (status = 401, description = "Login required", body = ErrorSchema),
        (status = 404, description = "Unknown group", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "getGroup"
)]
#[get("/groups/{group_id}")]
pub async fn get_group(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<GroupResponse>> {
    session.require_user_id()?;
    let group = state.groups.get_group(group_id(&path)?).await?;
    Ok(web::Json(group.into()))
}

/// Creator approval of a pending group.
#[utoipa::path(
    post,
    path = "/api/v1/groups/{groupId}/approve",
    params(("groupId" = String, Path, description = "Group identifier")),
    responses(
        (status = 200, description = "Group approved", body = GroupResponse),
        (status = 403, description = "Only the creator may approve", body = ErrorSchema),
        (status = 409, description = "Already approved", body = ErrorSchema),
        (status = 422, description = "Group is not pending", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "approveGroup"
)]
#[post("/groups/{group_id}/approve")]
pub async fn approve_group(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<GroupResponse>> {
    let actor = session.require_user_id()?;
    let group = state.groups.approve_group(group_id(&path)?, actor).await?;
    Ok(web::Json(group.into()))
}

/// Fix contribution terms, build the payout schedule and start round 1.
#[utoipa::path(
    post,
    path = "/api/v1/groups/{groupId}/activate",
    params(("groupId" = String, Path, description = "Group identifier")),
    request_body = ActivateGroupBody,
    responses(
        (status = 200, description = "Group active", body = GroupResponse),
        (status = 400, description = "Invalid terms or payout order", body = ErrorSchema),
        (status = 403, description = "Admins only", body = ErrorSchema),
        (status = 422, description = "Group cannot be activated", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "activateGroup"
)]
#[post("/groups/{group_id}/activate")]
pub async fn activate_group(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<ActivateGroupBody>,
) -> ApiResult<web::Json<GroupResponse>> {
    let actor = session.require_user_id()?;
    let body = payload.into_inner();
    let request = ActivateGroupRequest {
        group_id: group_id(&path)?,
        actor,
        contribution_amount: parse_money(
            &body.contribution_amount,
            FieldName::new("contributionAmount"),
        )?,
        period_days: body.period_days,
        payout_order: parse_id_list::<UserId>(&body.payout_order, FieldName::new("payoutOrder"))?,
    };
    let group = state.groups.activate_group(request).await?;
    Ok(web::Json(group.into()))
}

/// Rotation schedule ordered by round.
#[utoipa::path(
    get,
    path = "/api/v1/groups/{groupId}/payout-schedule",
    params(("groupId" = String, Path, description = "Group identifier")),
    responses(
        (status = 200, description = "Schedule", body = [ScheduleEntryResponse]),
        (status = 403, description = "Members only", body = ErrorSchema),
        (status = 404, description = "Unknown group", body = ErrorSchema)
    ),
    tags = ["groups"],
    operation_id = "payoutSchedule"
)]
#[get("/groups/{group_id}/payout-schedule")]
pub async fn payout_schedule(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<ScheduleEntryResponse>>> {
    let actor = session.require_user_id()?;
    let schedule = state.groups.payout_schedule(group_id(&path)?, actor).await?;
    Ok(web::Json(schedule.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service_fixtures::{MEMBER_WALLET, Mocks, identity};
    use crate::inbound::http::test_utils::{call_json, session_cookie, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[actix_web::test]
    async fn create_requires_login() {
        let app = actix_test::init_service(test_app(Mocks::default())).await;
        let (status, _) = call_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/groups")
                .set_json(json!({"name": "Harambee", "wallet": MEMBER_WALLET})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[rstest]
    #[actix_web::test]
    async fn create_returns_pending_group() {
        let creator = UserId::random();
        let mut mocks = Mocks::default();
        mocks
            .users
            .expect_find()
            .returning(|id| Ok(Some(identity(id))));
        mocks.groups.expect_create().times(1).returning(|_, _| Ok(()));
        let app = actix_test::init_service(test_app(mocks)).await;
        let cookie = session_cookie(&app, creator).await;

        let (status, value) = call_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/groups")
                .cookie(cookie)
                .set_json(json!({"name": "Harambee", "wallet": MEMBER_WALLET, "minMembers": 3})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(value["status"], "pending");
        assert_eq!(value["creatorId"], creator.to_string());
        assert_eq!(value["minMembers"], 3);
        assert_eq!(value["isApproved"], false);
    }

    #[rstest]
    #[actix_web::test]
    async fn malformed_group_id_is_bad_request() {
        let app = actix_test::init_service(test_app(Mocks::default())).await;
        let cookie = session_cookie(&app, UserId::random()).await;
        let (status, value) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/groups/not-a-uuid")
                .cookie(cookie),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["details"]["field"], "groupId");
    }

    #[rstest]
    #[actix_web::test]
    async fn unknown_group_is_not_found() {
        let mut mocks = Mocks::default();
        mocks.groups.expect_find_by_id().returning(|_| Ok(None));
        let app = actix_test::init_service(test_app(mocks)).await;
        let cookie = session_cookie(&app, UserId::random()).await;

        let (status, value) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/groups/{}", GroupId::random()))
                .cookie(cookie),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["code"], "not_found");
    }

    #[rstest]
    #[case(json!({"contributionAmount": "1.123456789", "periodDays": 7, "payoutOrder": []}), "contributionAmount")]
    #[case(json!({"contributionAmount": "100", "periodDays": 7, "payoutOrder": ["x"]}), "payoutOrder")]
    #[actix_web::test]
    async fn activation_validates_body(#[case] body: serde_json::Value, #[case] field: &str) {
        let app = actix_test::init_service(test_app(Mocks::default())).await;
        let cookie = session_cookie(&app, UserId::random()).await;
        let (status, value) = call_json(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/groups/{}/activate", GroupId::random()))
                .cookie(cookie)
                .set_json(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["details"]["field"], field);
    }
}
