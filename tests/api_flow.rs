use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use checkin::config::Config;
use checkin::models::Participant;
use checkin::services::staff_service::AccountInput;
use checkin::stores::memory::{MemoryLog, MemoryRoster, MemoryStaffStore};
use checkin::stores::{LogStore, Stores};
use checkin::web::{build_router, state::AppState};

struct TestApp {
    router: Router,
    log: Arc<MemoryLog>,
    admin_id: String,
}

async fn test_app(allow_registration: bool) -> TestApp {
    let config = Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some("integration-secret".to_string()),
        "ALLOW_REGISTRATION" => Some(allow_registration.to_string()),
        _ => None,
    })
    .expect("config");

    let roster = MemoryRoster::new(vec![Participant {
        id: "ABC12345".to_string(),
        name: "Rina Wulandari".to_string(),
        organization: String::new(),
        organization_name: "Dinas Kominfo".to_string(),
        gender: "Perempuan".to_string(),
    }]);
    let log = Arc::new(MemoryLog::default());
    let stores = Stores {
        roster: Arc::new(roster),
        log: log.clone(),
        staff: Arc::new(MemoryStaffStore::new(vec![])),
    };

    let state = AppState::new(stores, &config);
    let admin = state
        .staff
        .create(AccountInput {
            username: "admin".to_string(),
            password: "admin-pass".to_string(),
            name: "Admin".to_string(),
            role: "admin".to_string(),
        })
        .await
        .expect("admin");
    state
        .staff
        .create(AccountInput {
            username: "desk1".to_string(),
            password: "desk-pass".to_string(),
            name: "Desk One".to_string(),
            role: "user".to_string(),
        })
        .await
        .expect("desk user");

    TestApp {
        router: build_router(state),
        log,
        admin_id: admin.id,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, cookie, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("token={token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, cookie, body) = send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "username": username, "password": password }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    let cookie = cookie.expect("session cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    cookie
        .split(';')
        .next()
        .and_then(|c| c.strip_prefix("token="))
        .expect("token cookie")
        .to_string()
}

#[tokio::test]
async fn check_in_is_recorded_once() {
    let app = test_app(false).await;
    let token = login(&app.router, "desk1", "desk-pass").await;

    let lookup = get("/api/participant?id=abc12345", Some(&token));
    let (status, _, body) = send(&app.router, lookup).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "found");
    assert_eq!(body["data"]["organization"], "Dinas Kominfo");
    assert_eq!(body["data"]["attended"], false);

    let check_in = || {
        json_request(
            "POST",
            "/api/participant",
            Some(&token),
            json!({ "id": "ABC12345" }),
        )
    };

    let (status, _, body) = send(&app.router, check_in()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "verified");
    let status_line = body["data"]["status"].as_str().unwrap();
    assert!(status_line.starts_with("Present - "));
    assert!(status_line.ends_with("(by: Desk One)"));
    assert_eq!(app.log.count_rows().await.unwrap(), 1);

    let original = app.log.find_by_id("ABC12345").await.unwrap().unwrap();

    let (status, _, body) = send(&app.router, check_in()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "error");
    assert_eq!(body["timestamp"], original.timestamp.as_str());
    assert_eq!(app.log.count_rows().await.unwrap(), 1);

    let (status, _, body) = send(&app.router, get("/api/statistics", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalParticipants"], 1);
    assert_eq!(body["data"]["attended"], 1);
    assert_eq!(body["data"]["attendanceRate"], 100.0);

    let (status, _, body) =
        send(&app.router, get("/api/participants?status=hadir", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["status"], "Present");
}

#[tokio::test]
async fn unknown_participant_is_not_found() {
    let app = test_app(false).await;
    let token = login(&app.router, "desk1", "desk-pass").await;

    let (status, _, body) = send(
        &app.router,
        json_request("POST", "/api/participant", Some(&token), json!({ "id": "NOPE" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "not_found");

    let (status, _, _) = send(
        &app.router,
        json_request("POST", "/api/participant", Some(&token), json!({ "id": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.log.count_rows().await.unwrap(), 0);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = test_app(false).await;

    let (status, _, body) = send(&app.router, get("/api/participants", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let token = login(&app.router, "desk1", "desk-pass").await;
    let mut tampered = token.clone();
    tampered.push('x');
    let (status, _, _) = send(&app.router, get("/api/statistics", Some(&tampered))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&app.router, get("/api/users", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = send(&app.router, get("/api/auth/verify", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "desk1");
    assert_eq!(body["user"]["role"], "user");

    let (status, _, _) = send(
        &app.router,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "username": "desk1", "password": "wrong-pass" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let app = test_app(false).await;
    let (status, cookie, _) = send(
        &app.router,
        json_request("POST", "/api/auth/logout", None, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cookie = cookie.expect("removal cookie");
    assert!(cookie.starts_with("token=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn admin_manages_staff_accounts() {
    let app = test_app(false).await;
    let token = login(&app.router, "admin", "admin-pass").await;

    let (status, _, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/users",
            Some(&token),
            json!({ "username": "abc", "password": "secret1", "name": "Abc", "role": "user" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let new_id = body["user"]["id"].as_str().unwrap().to_string();
    assert_eq!(new_id, "3");

    let (status, _, _) = send(
        &app.router,
        json_request(
            "POST",
            "/api/users",
            Some(&token),
            json!({ "username": "ABC", "password": "secret2", "name": "Abc 2", "role": "user" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, body) = send(
        &app.router,
        json_request(
            "PUT",
            "/api/users",
            Some(&token),
            json!({
                "id": new_id,
                "username": "abc",
                "password": "",
                "name": "Abc Renamed",
                "role": "admin",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "admin");

    let (status, _, body) = send(&app.router, get("/api/users", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 3);
    assert!(users
        .iter()
        .all(|u| u.get("password").is_none() && u.get("password_hash").is_none()));

    let delete = |id: &str| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/users?id={id}"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    };
    let (status, _, _) = send(&app.router, delete(&app.admin_id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = send(&app.router, delete("99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = send(&app.router, delete(&new_id)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(&app.router, get("/api/debug/stores", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["roster"]["backend"], "memory");
    assert_eq!(body["data"]["staff"]["accounts"], 2);
}

#[tokio::test]
async fn registration_can_be_disabled() {
    let closed = test_app(false).await;
    let register = || {
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "username": "newdesk", "password": "secret1", "name": "New Desk" }),
        )
    };
    let (status, _, _) = send(&closed.router, register()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let open = test_app(true).await;
    let (status, _, body) = send(&open.router, register()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "user");
    login(&open.router, "newdesk", "secret1").await;
}
