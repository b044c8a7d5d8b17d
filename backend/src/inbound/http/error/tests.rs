//! Tests for HTTP error mapping.

use super::*;
use actix_web::body::to_bytes;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn internal_error() -> Error {
    Error::internal("pool exhausted on replica 3")
        .with_trace_id(TRACE_ID)
        .with_details(json!({"table": "payout_requests"}))
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("login required"), StatusCode::UNAUTHORIZED)]
#[case(Error::forbidden("admins only"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::conflict("already voted"), StatusCode::CONFLICT)]
#[case(Error::precondition_failed("not active"), StatusCode::UNPROCESSABLE_ENTITY)]
#[case(Error::external_failure("ledger timeout"), StatusCode::BAD_GATEWAY)]
#[case(Error::service_unavailable("db down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), status);
}

async fn body_of(error: &Error) -> (StatusCode, Option<String>, Value) {
    let response = ResponseError::error_response(error);
    let status = response.status();
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .map(|value| value.to_str().expect("ascii header").to_owned());
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let body = serde_json::from_slice(&bytes).expect("error body is JSON");
    (status, header, body)
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted(internal_error: Error) {
    let (status, header, body) = body_of(&internal_error).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header.as_deref(), Some(TRACE_ID));
    assert_eq!(body["message"], "Internal server error");
    assert_eq!(body["code"], "internal_error");
    assert_eq!(body["traceId"], TRACE_ID);
    assert!(body.get("details").is_none_or(Value::is_null));
}

#[rstest]
#[actix_web::test]
async fn client_errors_keep_message_and_details() {
    let error = Error::precondition_failed("round not fully paid")
        .with_trace_id(TRACE_ID)
        .with_details(json!({"paid": 2, "required": 3}));

    let (status, header, body) = body_of(&error).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(header.as_deref(), Some(TRACE_ID));
    assert_eq!(body["code"], "precondition_failed");
    assert_eq!(body["message"], "round not fully paid");
    assert_eq!(body["details"], json!({"paid": 2, "required": 3}));
}

#[rstest]
#[actix_web::test]
async fn trace_header_is_omitted_without_trace_id() {
    let (_, header, _) = body_of(&Error::not_found("group not found")).await;
    assert!(header.is_none());
}

#[rstest]
fn actix_errors_become_redacted_internal_errors() {
    let actix_error = actix_web::error::ErrorBadGateway("upstream said no");
    let error = Error::from(actix_error);
    assert_eq!(error.code(), ErrorCode::InternalError);
    assert_eq!(error.message(), "Internal server error");
}

#[rstest]
fn extractor_errors_render_as_invalid_request() {
    let error = extractor_error("Json deserialize error: missing field `amount`");
    assert_eq!(error.as_response_error().status_code(), StatusCode::BAD_REQUEST);
}
