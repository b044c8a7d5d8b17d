//! Identity endpoints.
//!
//! ```text
//! POST /api/v1/users     {"displayName":"Achieng","email":"a@example.com","wallet":"G..."}
//! GET  /api/v1/users/me
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, RegisterUserRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::dto::UserResponse;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_display_name, parse_email, parse_wallet};

/// Registration payload.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserBody {
    #[schema(example = "Achieng")]
    pub display_name: String,
    #[schema(example = "achieng@example.com")]
    pub email: String,
    #[schema(example = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7")]
    pub wallet: String,
}

impl TryFrom<RegisterUserBody> for RegisterUserRequest {
    type Error = Error;

    fn try_from(body: RegisterUserBody) -> Result<Self, Self::Error> {
        Ok(Self {
            display_name: parse_display_name(&body.display_name, FieldName::new("displayName"))?,
            email: parse_email(&body.email, FieldName::new("email"))?,
            wallet: parse_wallet(&body.wallet, FieldName::new("wallet"))?,
        })
    }
}

/// Register an identity and start a session for it.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = RegisterUserBody,
    responses(
        (status = 201, description = "Registered", body = UserResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "Email already registered", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "registerUser",
    security([])
)]
#[post("/users")]
pub async fn register_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RegisterUserBody>,
) -> ApiResult<HttpResponse> {
    let request = RegisterUserRequest::try_from(payload.into_inner())?;
    let identity = state.users.register(request).await?;
    session.persist_user(identity.id)?;
    Ok(HttpResponse::Created().json(UserResponse::from(identity)))
}

/// Identity behind the current session.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Login required", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "currentUser"
)]
#[get("/users/me")]
pub async fn current_user(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<UserResponse>> {
    let user_id = session.require_user_id()?;
    let identity = state.users.current(user_id).await?;
    Ok(web::Json(identity.into()))
}
