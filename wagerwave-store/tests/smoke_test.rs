use std::sync::Arc;

use axum::body::Body;
use http::{Method, Request, StatusCode};
use reqwest::Url;
use serde_json::{json, Value};
use tower::ServiceExt;

use wagerwave_common::{Role, SessionPointer, UserRecord};
use wagerwave_store::store::SessionEntry;
use wagerwave_store::test_util::create_test_state;
use wagerwave_store::{routes, token, AppState};

async fn send(app: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("Content-Type", "application/json");
    }
    let request = builder
        .body(match body {
            Some(b) => Body::from(b.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn app() -> (axum::Router, Arc<AppState>) {
    let (state, _, _) = create_test_state();
    (routes::app(state.clone()), state)
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_login_top_up_logout_flow() {
    let (app, state) = app();

    let (status, _) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, session) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({"username": "alice", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user"]["username"], "alice");
    assert_eq!(session["user"]["points"], 0);
    assert_eq!(session["user"]["phone"], "555-0100");

    let (status, menu) = send(&app, Method::GET, "/points/top-up", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(menu["amounts"], json!([50, 100, 200, 500, 1000, 2000]));

    let (status, balance) = send(&app, Method::POST, "/points/top-up", Some(json!({"amount": 200}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["points"], 200);

    let (status, session) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user"]["points"], 200);
    assert_eq!(state.store.all_users()[0].points, 200);

    let (status, _) = send(&app, Method::POST, "/auth/logout", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(state.store.all_users().len(), 1);
}

#[tokio::test]
async fn test_login_errors() {
    let (app, _) = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({"username": "alice", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["type"], "invalid_credentials");

    let (status, body) = send(&app, Method::POST, "/auth/login", Some(json!({"username": "alice"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "missing_field");
}

#[tokio::test]
async fn test_top_up_rejections() {
    let (app, _) = app();

    let (status, body) = send(&app, Method::POST, "/points/top-up", Some(json!({"amount": 100}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "no_active_session");

    send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({"username": "alice", "password": "secret"})),
    )
    .await;
    let (status, body) = send(&app, Method::POST, "/points/top-up", Some(json!({"amount": 75}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_amount");
}

#[tokio::test]
async fn test_register_then_conflict() {
    let (app, state) = app();
    let form = json!({
        "username": "bob",
        "password": "pw",
        "confirmPassword": "pw",
        "phone": "555-0199",
        "referralCode": "FRIEND"
    });

    let (status, user) = send(&app, Method::POST, "/auth/register", Some(form.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["username"], "bob");
    assert_eq!(user["referralCode"], "FRIEND");
    assert_eq!(user["points"], 0);
    assert!(state.store.session().is_none());

    let (status, body) = send(&app, Method::POST, "/auth/register", Some(form)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "username_taken");

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        Some(json!({"username": "carol", "password": "a", "confirmPassword": "b"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "password_mismatch");
}

#[tokio::test]
async fn test_admin_routes_require_admin_session() {
    let (app, _) = app();

    let (status, _) = send(&app, Method::GET, "/admin/users", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({"username": "alice", "password": "secret"})),
    )
    .await;
    let (status, _) = send(&app, Method::GET, "/admin/users", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/admin-login",
        Some(json!({"username": "alice", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["type"], "not_admin");
}

#[tokio::test]
async fn test_admin_grant_and_status() {
    let (app, state) = app();

    let (_, alice) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({"username": "alice", "password": "secret"})),
    )
    .await;
    let alice_id = alice["user"]["id"].as_str().unwrap().to_string();

    let (status, admin) = send(
        &app,
        Method::POST,
        "/auth/admin-login",
        Some(json!({"username": "root", "password": "toor"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(admin["user"]["role"], "admin");

    let (status, users) = send(&app, Method::GET, "/admin/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["username"], "alice");

    let uri = format!("/admin/users/{}/points", alice_id);
    let (status, balance) = send(&app, Method::POST, &uri, Some(json!({"amount": 12345}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["points"], 12345);

    let (status, body) = send(&app, Method::POST, &uri, Some(json!({"amount": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_amount");

    let (status, body) = send(
        &app,
        Method::POST,
        "/admin/users/ghost/points",
        Some(json!({"amount": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "user_not_found");

    let uri = format!("/admin/users/{}/status", alice_id);
    let (status, user) = send(&app, Method::POST, &uri, Some(json!({"status": "deactivated"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["status"], "deactivated");

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({"username": "alice", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["type"], "account_deactivated");
    assert!(state.store.session().unwrap().is_admin());
}

#[tokio::test]
async fn test_prefill_endpoint() {
    let (app, _) = app();
    let token = token::encode("p@ss 123");

    let uri = prefill_uri(&[("username", "alice"), ("token", token.as_str())]);
    let (status, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "filled");
    assert_eq!(body["password"], "p@ss 123");
    assert_eq!(body["source"], "secure_token");

    let link = Url::parse_with_params(
        "https://wager.example/login",
        &[("username", "alice"), ("token", token.as_str())],
    )
    .unwrap();
    let uri = prefill_uri(&[("url", link.as_str())]);
    let (status, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scrubbedUrl"], "https://wager.example/login");

    let (status, body) = send(&app, Method::GET, "/auth/prefill?username=alice&token=%25%25", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "invalid_token");

    let (status, _) = send(&app, Method::GET, "/auth/prefill?username=alice", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_session_view_follows_other_context() {
    let (state, storage, _) = create_test_state();
    let app = routes::app(state.clone());

    // Another tab signs a user in on the same storage.
    let other = storage.attach();
    let mut user = UserRecord::new("u9", "zed");
    user.points = 42;
    user.role = Role::User;
    other.put_all_users(&[user]).unwrap();
    let mut rx = state.session_view.subscribe();
    other
        .put_session(Some(&SessionEntry {
            pointer: SessionPointer::new("u9"),
            canonical: None,
        }))
        .unwrap();

    while rx.borrow_and_update().is_none() {
        rx.changed().await.unwrap();
    }

    let (status, session) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user"]["points"], 42);
}

fn prefill_uri(params: &[(&str, &str)]) -> String {
    let url = Url::parse_with_params("http://localhost/auth/prefill", params).unwrap();
    format!("{}?{}", url.path(), url.query().unwrap_or_default())
}
