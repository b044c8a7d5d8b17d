//! Notification inbox endpoints.
//!
//! ```text
//! GET  /api/v1/notifications?unreadOnly=true
//! POST /api/v1/notifications/{id}/read
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;

use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::NotificationResponse;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Inbox filter.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// Notifications addressed to the current user, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(("unreadOnly" = Option<bool>, Query, description = "Only unread notifications")),
    responses(
        (status = 200, description = "Inbox", body = [NotificationResponse]),
        (status = 401, description = "Login required", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "listNotifications"
)]
#[get("/notifications")]
pub async fn list_notifications(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<InboxQuery>,
) -> ApiResult<web::Json<Vec<NotificationResponse>>> {
    let actor = session.require_user_id()?;
    let entries = state.notifications.list(actor, query.unread_only).await?;
    Ok(web::Json(entries.into_iter().map(Into::into).collect()))
}

/// Mark one of the current user's notifications read.
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = i64, Path, description = "Notification identifier")),
    responses(
        (status = 204, description = "Marked read"),
        (status = 401, description = "Login required", body = ErrorSchema),
        (status = 404, description = "Unknown notification", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "markNotificationRead"
)]
#[post("/notifications/{id}/read")]
pub async fn mark_notification_read(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_user_id()?;
    state.notifications.mark_read(actor, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
