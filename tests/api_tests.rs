use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use staffclock::api::{AppState, router};
use staffclock::config::Config;
use staffclock::core::oauth::{FederatedIdentity, IdentityProvider};
use staffclock::db::initialize::init_db;
use staffclock::db::pool::DbPool;
use staffclock::errors::{AppError, AppResult};
use std::sync::Arc;
use tower::ServiceExt;

// Bengaluru office and a point roughly 5 km north of it.
const HQ: (f64, f64) = (12.9629, 77.5775);
const FAR: (f64, f64) = (13.0079, 77.5775);

struct FakeGoogle;

#[async_trait]
impl IdentityProvider for FakeGoogle {
    fn authorize_url(&self, state: &str) -> AppResult<String> {
        Ok(format!("https://accounts.example/consent?client_id=test&state={state}"))
    }

    async fn exchange(&self, code: &str) -> AppResult<FederatedIdentity> {
        match code {
            "good" => Ok(FederatedIdentity {
                email: "Gina@Example.com".into(),
                name: Some("Gina".into()),
            }),
            _ => Err(AppError::OAuth("invalid_grant".into())),
        }
    }
}

fn test_config() -> Config {
    Config {
        jwt_secret: "integration-secret".into(),
        ..Config::default()
    }
}

fn state() -> AppState {
    let pool = DbPool::in_memory().expect("in-memory db");
    init_db(&pool.conn).expect("init db");
    AppState::new(pool, test_config())
}

fn app() -> Router {
    router(state())
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Register an account and return `(token, user id)`.
async fn register(app: &Router, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": email, "name": "Test", "password": "pw-123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn register_manager(app: &Router, email: &str) -> (String, String) {
    let (token, id) = register(app, email).await;
    let (status, body) = send(
        app,
        "PUT",
        "/api/auth/update-role",
        Some(&token),
        Some(json!({ "role": "manager" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["role"], "manager");
    (token, id)
}

async fn create_hq(app: &Router, token: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/perimeters",
        Some(token),
        Some(json!({
            "name": "HQ",
            "location": "Bengaluru office",
            "latitude": "12.9629° N",
            "longitude": HQ.1,
            "radiusMeters": 200
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["perimeter"]["id"].as_str().unwrap().to_string()
}

fn at(point: (f64, f64)) -> Value {
    json!({ "latitude": point.0, "longitude": point.1 })
}

#[tokio::test]
async fn root_reports_running() {
    let app = app();
    let resp = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"staffclock API is running");
}

#[tokio::test]
async fn register_login_and_me() {
    let app = app();
    let (token, id) = register(&app, "Ann@Example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": "ann@example.com", "name": "Ann", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists. Please login to continue");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": "bob@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email, name, and password are required");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "ann@example.com", "password": "pw-123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id.as_str());
    assert!(body["user"].get("passwordHash").is_none());

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "ann@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ann@example.com");
    assert_eq!(body["user"]["role"], "worker");
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = app();
    let (status, _) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/api/clock/clock-in", None, Some(at(HQ))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn update_role_rules() {
    let app = app();
    let (worker, _) = register(&app, "w@example.com").await;
    let (_, other_id) = register(&app, "o@example.com").await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/auth/update-role",
        Some(&worker),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/auth/update-role",
        Some(&worker),
        Some(json!({ "role": "manager", "userId": other_id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/auth/update-role",
        Some(&worker),
        Some(json!({ "role": "overlord" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid role: overlord");
}

#[tokio::test]
async fn clock_in_and_out_flow() {
    let app = app();
    let (worker, worker_id) = register(&app, "w@example.com").await;

    // Nothing configured yet.
    let (status, body) = send(&app, "POST", "/api/clock/clock-in", Some(&worker), Some(at(HQ))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No perimeter configured");

    let (manager, _) = register_manager(&app, "m@example.com").await;
    create_hq(&app, &manager).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/clock/clock-in",
        Some(&worker),
        Some(json!({ "latitude": "abc", "longitude": HQ.1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid coordinates");

    let (status, body) = send(&app, "POST", "/api/clock/clock-in", Some(&worker), Some(at(FAR))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Outside perimeter");
    assert!(body["distanceMeters"].as_i64().unwrap() > 4000);

    let (status, body) = send(&app, "POST", "/api/clock/clock-out", Some(&worker), Some(at(HQ))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Not clocked in");

    let (status, body) = send(
        &app,
        "POST",
        "/api/clock/clock-in",
        Some(&worker),
        Some(json!({ "latitude": HQ.0, "longitude": HQ.1, "note": "  morning  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Clocked in");
    assert_eq!(body["record"]["userId"], worker_id.as_str());

    let (status, body) = send(&app, "POST", "/api/clock/clock-in", Some(&worker), Some(at(HQ))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Already clocked in");

    let (status, body) = send(&app, "GET", "/api/clock/active-staff", Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"].as_array().unwrap().len(), 1);

    // Clock-out has no perimeter requirement.
    let (status, body) = send(&app, "POST", "/api/clock/clock-out", Some(&worker), Some(at(FAR))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Clocked out");
    assert!(body["record"]["clockOutAt"].is_string());

    let (_, body) = send(&app, "GET", "/api/clock/active-staff", Some(&manager), None).await;
    assert!(body["active"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn logs_are_owner_or_manager_only() {
    let app = app();
    let (w1, w1_id) = register(&app, "w1@example.com").await;
    let (w2, _) = register(&app, "w2@example.com").await;
    let (manager, _) = register_manager(&app, "m@example.com").await;
    create_hq(&app, &manager).await;

    send(&app, "POST", "/api/clock/clock-in", Some(&w1), Some(at(HQ))).await;

    let uri = format!("/api/clock/user/{w1_id}/logs");
    let (status, body) = send(&app, "GET", &uri, Some(&w1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "GET", &uri, Some(&w2), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", &uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"].as_array().unwrap().len(), 1);

    let bad = format!("{uri}?from=2025-03-10&to=2025-03-01");
    let (status, _) = send(&app, "GET", &bad, Some(&w1), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dashboard_requires_manager() {
    let app = app();
    let (worker, _) = register(&app, "w@example.com").await;
    let (manager, _) = register_manager(&app, "m@example.com").await;

    let (status, _) = send(&app, "GET", "/api/clock/dashboard", Some(&worker), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/api/clock/dashboard?days=7", Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["avgHoursPerDay"].is_array());
    assert!(body["totalHoursPerStaffLastWeek"].is_array());
    assert!(body["range"]["from"].is_string());

    let (status, _) = send(&app, "GET", "/api/clock/dashboard?days=zero", Some(&manager), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Extended years are refused before any date arithmetic.
    let (status, body) = send(
        &app,
        "GET",
        "/api/clock/dashboard?to=-262143-01-05&days=3660",
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        "GET",
        "/api/clock/dashboard?to=0001-01-01&days=3660",
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_query_and_path_return_json_errors() {
    let app = app();
    let (manager, manager_id) = register_manager(&app, "m@example.com").await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/clock/dashboard?days=1&days=2",
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let uri = format!("/api/clock/user/{manager_id}/logs?from=2025-01-01&from=2025-02-01");
    let (status, body) = send(&app, "GET", &uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let (status, body) = send(&app, "GET", "/api/perimeters/%FF", Some(&manager), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");
}

#[tokio::test]
async fn perimeters_are_scoped_to_their_manager() {
    let app = app();
    let (a, _) = register_manager(&app, "a@example.com").await;
    let (b, _) = register_manager(&app, "b@example.com").await;
    let (worker, _) = register(&app, "w@example.com").await;

    let id = create_hq(&app, &a).await;
    let uri = format!("/api/perimeters/{id}");

    let (status, _) = send(&app, "GET", "/api/perimeters", Some(&worker), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", &uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");

    let (status, _) = send(&app, "PUT", &uri, Some(&b), Some(json!({ "name": "Mine" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/perimeters", Some(&b), None).await;
    assert!(body["perimeters"].as_array().unwrap().is_empty());

    let (status, body) = send(&app, "PUT", &uri, Some(&a), Some(json!({ "radiusKm": 1.5 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["perimeter"]["radius"], 1500.0);
    assert_eq!(body["perimeter"]["name"], "HQ");

    let (status, body) = send(&app, "DELETE", &uri, Some(&a), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Perimeter deleted");

    let (status, _) = send(&app, "GET", &uri, Some(&a), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn within_check_reports_nearest() {
    let app = app();
    let (manager, _) = register_manager(&app, "m@example.com").await;
    let (worker, _) = register(&app, "w@example.com").await;
    create_hq(&app, &manager).await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/perimeters/check/within?latitude=12.9630&longitude=77.5775",
        Some(&worker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inside"], true);
    assert_eq!(body["nearest"]["name"], "HQ");

    let (status, body) = send(
        &app,
        "GET",
        "/api/perimeters/check/within?latitude=13.0079&longitude=77.5775",
        Some(&worker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inside"], false);
}

#[tokio::test]
async fn google_sign_in_needs_a_provider() {
    let app = app();
    let (status, _) = send(&app, "GET", "/api/auth/google", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", "/api/auth/google/callback?code=good", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn get_with_cookie(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut req = Request::builder().uri(uri);
    if let Some(c) = cookie {
        req = req.header(header::COOKIE, c);
    }
    app.clone().oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
}

async fn json_of(resp: Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// Start the Google flow and return `(state, cookie pair)`.
async fn start_google(app: &Router) -> (String, String) {
    let resp = get_with_cookie(app, "/api/auth/google", None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.contains("HttpOnly"));
    let pair = set_cookie.split(';').next().unwrap().to_string();
    let (_, state) = pair.split_once('=').unwrap();
    assert_eq!(state.len(), 32);

    let location = resp.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(
        location,
        format!("https://accounts.example/consent?client_id=test&state={state}")
    );
    (state.to_string(), pair)
}

#[tokio::test]
async fn google_sign_in_with_provider() {
    let app = router(state().with_identity_provider(Arc::new(FakeGoogle)));
    let (nonce, cookie) = start_google(&app).await;

    let uri = format!("/api/auth/google/callback?code=good&state={nonce}");
    let resp = get_with_cookie(&app, &uri, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[header::SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));
    let first = json_of(resp).await;
    assert_eq!(first["user"]["email"], "gina@example.com");
    assert_eq!(first["user"]["provider"], "google");
    let token = first["token"].as_str().unwrap();

    let (status, me) = send(&app, "GET", "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["id"], first["user"]["id"]);

    // Same identity maps to the same account.
    let (nonce, cookie) = start_google(&app).await;
    let uri = format!("/api/auth/google/callback?code=good&state={nonce}");
    let second = json_of(get_with_cookie(&app, &uri, Some(&cookie)).await).await;
    assert_eq!(second["user"]["id"], first["user"]["id"]);

    let uri = format!("/api/auth/google/callback?state={nonce}");
    let resp = get_with_cookie(&app, &uri, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let uri = format!("/api/auth/google/callback?code=bad&state={nonce}");
    let resp = get_with_cookie(&app, &uri, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn google_callback_rejects_foreign_state() {
    let app = router(state().with_identity_provider(Arc::new(FakeGoogle)));
    let (nonce, cookie) = start_google(&app).await;

    // No cookie: the callback was not started from this browser.
    let uri = format!("/api/auth/google/callback?code=good&state={nonce}");
    let resp = get_with_cookie(&app, &uri, None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(resp).await["error"], "Invalid OAuth state");

    // Cookie present but the returned state differs.
    let resp = get_with_cookie(
        &app,
        "/api/auth/google/callback?code=good&state=attacker",
        Some(&cookie),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // State missing from the query.
    let resp = get_with_cookie(&app, "/api/auth/google/callback?code=good", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
