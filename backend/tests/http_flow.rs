//! End-to-end REST flow over the in-memory adapters.
//!
//! Three members register, form and activate a group, pay round one and
//! approve its payout through `/api/v1`.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use chama_backend::domain::{ApprovalPolicy, TRACE_ID_HEADER, WalletAddress};
use chama_backend::inbound::http::configure_api;
use chama_backend::inbound::http::state::HttpState;
use chama_backend::outbound::memory::{MemoryNotificationSink, MemoryStore, ScriptedLedger};
use chama_backend::Trace;
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::{Value, json};

fn wallet_for(letter: char) -> String {
    format!("G{}", letter.to_string().repeat(55))
}

async fn send<S>(app: &S, req: test::TestRequest, cookie: Option<&Cookie<'static>>) -> ServiceResponse
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = match cookie {
        Some(cookie) => req.cookie(cookie.clone()),
        None => req,
    };
    test::call_service(app, req.to_request()).await
}

async fn json_call<S>(
    app: &S,
    req: test::TestRequest,
    cookie: Option<&Cookie<'static>>,
) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let res = send(app, req, cookie).await;
    let status = res.status();
    let bytes = test::read_body(res).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, body)
}

/// Register a user and return their id and session cookie.
async fn register<S>(app: &S, name: &str, letter: char) -> (String, Cookie<'static>)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let res = send(
        app,
        test::TestRequest::post().uri("/api/v1/users").set_json(json!({
            "displayName": name,
            "email": format!("{}@example.test", name.to_lowercase()),
            "wallet": wallet_for(letter),
        })),
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let cookie = res
        .response()
        .cookies()
        .find(|c| c.name() == "session")
        .expect("session cookie")
        .into_owned();
    let body: Value = test::read_body_json(res).await;
    let id = body["id"].as_str().expect("user id").to_owned();
    (id, cookie)
}

#[rstest]
#[actix_rt::test]
async fn members_collect_a_round_and_pay_it_out() {
    let ledger = ScriptedLedger::new();
    let inbox = MemoryNotificationSink::new();
    let ports = MemoryStore::new().service_ports(
        Arc::new(ledger.clone()),
        Arc::new(inbox.clone()),
        Arc::new(DefaultClock),
    );
    let state = HttpState::new(&ports, ApprovalPolicy::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                    .cookie_name("session".to_owned())
                    .cookie_secure(false)
                    .build(),
            )
            .wrap(Trace)
            .configure(configure_api),
    )
    .await;

    let (amara, amara_cookie) = register(&app, "Amara", 'C').await;
    let (baraka, baraka_cookie) = register(&app, "Baraka", 'D').await;
    let (chege, chege_cookie) = register(&app, "Chege", 'E').await;

    let (status, me) = json_call(
        &app,
        test::TestRequest::get().uri("/api/v1/users/me"),
        Some(&baraka_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], baraka.as_str());

    let (status, group) = json_call(
        &app,
        test::TestRequest::post().uri("/api/v1/groups").set_json(json!({
            "name": "Harambee Circle",
            "description": "Monthly savings",
            "wallet": wallet_for('B'),
            "minMembers": 3,
            "maxMembers": 3,
        })),
        Some(&amara_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(group["status"], "pending");
    let group_id = group["id"].as_str().expect("group id").to_owned();
    let base = format!("/api/v1/groups/{group_id}");

    for (user, cookie) in [(&baraka, &baraka_cookie), (&chege, &chege_cookie)] {
        let (status, _) = json_call(
            &app,
            test::TestRequest::post().uri(&format!("{base}/members")),
            Some(cookie),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, member) = json_call(
            &app,
            test::TestRequest::post()
                .uri(&format!("{base}/members/{user}/review"))
                .set_json(json!({ "approve": true })),
            Some(&amara_cookie),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(member["status"], "approved");
    }

    let (status, _) = json_call(
        &app,
        test::TestRequest::post().uri(&format!("{base}/approve")),
        Some(&baraka_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, approved) = json_call(
        &app,
        test::TestRequest::post().uri(&format!("{base}/approve")),
        Some(&amara_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["isApproved"], true);

    let (status, active) = json_call(
        &app,
        test::TestRequest::post()
            .uri(&format!("{base}/activate"))
            .set_json(json!({
                "contributionAmount": "100",
                "periodDays": 30,
                "payoutOrder": [&amara, &baraka, &chege],
            })),
        Some(&amara_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["status"], "active");
    assert_eq!(active["currentRound"], 1);

    let (status, schedule) = json_call(
        &app,
        test::TestRequest::get().uri(&format!("{base}/payout-schedule")),
        Some(&chege_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(schedule.as_array().map(Vec::len), Some(3));

    for (expected, cookie) in [(false, &amara_cookie), (true, &baraka_cookie)] {
        let (status, outcome) = json_call(
            &app,
            test::TestRequest::post()
                .uri(&format!("{base}/admin-nominations"))
                .set_json(json!({ "nomineeId": &chege })),
            Some(cookie),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["promoted"], expected);
    }

    let (status, wrong) = json_call(
        &app,
        test::TestRequest::post()
            .uri(&format!("{base}/rounds/1/contributions"))
            .set_json(json!({ "amount": "99.5", "signingRef": "vault://amara" })),
        Some(&amara_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong["code"], "invalid_request");

    for cookie in [&amara_cookie, &baraka_cookie, &chege_cookie] {
        let (status, receipt) = json_call(
            &app,
            test::TestRequest::post()
                .uri(&format!("{base}/rounds/1/contributions"))
                .set_json(json!({ "amount": "100", "signingRef": "vault://member" })),
            Some(cookie),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(receipt["contribution"]["status"], "confirmed");
    }

    let (status, round) = json_call(
        &app,
        test::TestRequest::get().uri(&format!("{base}/rounds/1")),
        Some(&baraka_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(round["status"]["status"], "ready_for_payout");
    assert_eq!(round["status"]["totalReceived"], "300.0");

    let (status, authorised) = json_call(
        &app,
        test::TestRequest::post().uri(&format!("{base}/rounds/1/authorize-payout")),
        Some(&amara_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(authorised["recipient"]["userId"], amara.as_str());

    let (status, request) = json_call(
        &app,
        test::TestRequest::post()
            .uri(&format!("{base}/payout-requests"))
            .set_json(json!({ "recipientId": &amara, "amount": "300", "round": 1 })),
        Some(&amara_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "pending");
    let request_id = request["id"].as_str().expect("request id").to_owned();
    let votes = format!("/api/v1/payout-requests/{request_id}/votes");

    let (status, first) = json_call(
        &app,
        test::TestRequest::post().uri(&votes).set_json(json!({ "approve": true })),
        Some(&amara_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["outcome"], "still_pending");

    let (status, second) = json_call(
        &app,
        test::TestRequest::post().uri(&votes).set_json(json!({ "approve": true })),
        Some(&chege_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["outcome"], "approved");
    assert_eq!(second["request"]["status"], "completed");
    assert!(second["request"]["txHash"].is_string());

    let (_, group) = json_call(&app, test::TestRequest::get().uri(&base), Some(&baraka_cookie)).await;
    assert_eq!(group["currentRound"], 2);

    let payout = ledger
        .transfers()
        .into_iter()
        .find(|t| t.from == WalletAddress::new(wallet_for('B')).expect("wallet"))
        .expect("payout transfer");
    assert_eq!(payout.to.as_ref(), wallet_for('C'));
}

#[rstest]
#[actix_rt::test]
async fn unauthenticated_requests_carry_a_trace_id() {
    let ports = MemoryStore::new().service_ports(
        Arc::new(ScriptedLedger::new()),
        Arc::new(MemoryNotificationSink::new()),
        Arc::new(DefaultClock),
    );
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(HttpState::new(&ports, ApprovalPolicy::default())))
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                    .cookie_secure(false)
                    .build(),
            )
            .wrap(Trace)
            .configure(configure_api),
    )
    .await;

    let res = send(&app, test::TestRequest::get().uri("/api/v1/groups/not-a-uuid"), None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(TRACE_ID_HEADER));
}

#[rstest]
#[actix_rt::test]
async fn invited_members_join_through_their_inbox() {
    let ports = MemoryStore::new().service_ports(
        Arc::new(ScriptedLedger::new()),
        Arc::new(MemoryNotificationSink::new()),
        Arc::new(DefaultClock),
    );
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(HttpState::new(&ports, ApprovalPolicy::default())))
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                    .cookie_name("session".to_owned())
                    .cookie_secure(false)
                    .build(),
            )
            .wrap(Trace)
            .configure(configure_api),
    )
    .await;
    let (_, amara_cookie) = register(&app, "Amara", 'C').await;
    let (baraka, baraka_cookie) = register(&app, "Baraka", 'D').await;
    let (_, group) = json_call(
        &app,
        test::TestRequest::post().uri("/api/v1/groups").set_json(json!({
            "name": "Harambee Circle",
            "description": "Monthly savings",
            "wallet": wallet_for('B'),
            "minMembers": 3,
            "maxMembers": 5,
        })),
        Some(&amara_cookie),
    )
    .await;
    let group_id = group["id"].as_str().expect("group id").to_owned();

    let (status, invitation) = json_call(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/groups/{group_id}/invitations"))
            .set_json(json!({ "email": "baraka@example.test" })),
        Some(&amara_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let invitation_id = invitation["id"].as_str().expect("invitation id").to_owned();

    let (status, inbox) = json_call(
        &app,
        test::TestRequest::get().uri("/api/v1/notifications?unreadOnly=true"),
        Some(&baraka_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox[0]["kind"], "group_invitation");
    let notification_id = inbox[0]["id"].as_i64().expect("notification id");
    let res = send(
        &app,
        test::TestRequest::post().uri(&format!("/api/v1/notifications/{notification_id}/read")),
        Some(&baraka_cookie),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (_, pending) = json_call(
        &app,
        test::TestRequest::get().uri("/api/v1/invitations"),
        Some(&baraka_cookie),
    )
    .await;
    assert_eq!(pending[0]["id"], invitation_id.as_str());
    let (status, member) = json_call(
        &app,
        test::TestRequest::post().uri(&format!("/api/v1/invitations/{invitation_id}/accept")),
        Some(&baraka_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(member["userId"], baraka.as_str());
    assert_eq!(member["status"], "pending");

    let (status, again) = json_call(
        &app,
        test::TestRequest::post().uri(&format!("/api/v1/invitations/{invitation_id}/accept")),
        Some(&baraka_cookie),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(again["message"], "invitation already processed");

    let (_, admin_inbox) = json_call(
        &app,
        test::TestRequest::get().uri("/api/v1/notifications"),
        Some(&amara_cookie),
    )
    .await;
    assert_eq!(admin_inbox[0]["title"], "New member request");
    let (_, unread) = json_call(
        &app,
        test::TestRequest::get().uri("/api/v1/notifications?unreadOnly=true"),
        Some(&baraka_cookie),
    )
    .await;
    assert_eq!(unread, json!([]));
}
