//! Test helpers for inbound HTTP components.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, test, web};
use serde_json::Value;

use crate::domain::service_fixtures::Mocks;
use crate::domain::{ApprovalPolicy, Error, UserId};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Build a session middleware configured for tests.
///
/// Uses a fresh key per call, names the cookie `session` and drops the
/// `Secure` flag for plain HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Full API over mocked ports, plus `/test/session/{id}` to log in.
pub(crate) fn test_app(
    mocks: Mocks,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let state = HttpState::new(&mocks.quiet_notifications().ports(), ApprovalPolicy::default());
    App::new()
        .app_data(web::Data::new(state))
        .wrap(test_session_middleware())
        .configure(super::configure_api)
        .route(
            "/test/session/{user_id}",
            web::get().to(|session: SessionContext, path: web::Path<UserId>| async move {
                session.persist_user(path.into_inner())?;
                Ok::<_, Error>(HttpResponse::Ok())
            }),
        )
}

/// Session cookie for `user_id`.
pub(crate) async fn session_cookie<S>(app: &S, user_id: UserId) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let res = test::call_service(
        app,
        test::TestRequest::get()
            .uri(&format!("/test/session/{user_id}"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}

/// Send `request` and decode the JSON body, `Value::Null` when empty.
pub(crate) async fn call_json<S>(app: &S, request: test::TestRequest) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let res = test::call_service(app, request.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}
