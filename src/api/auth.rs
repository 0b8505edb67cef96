use crate::api::AppState;
use crate::api::dto::{GoogleCallbackQuery, LoginRequest, RegisterRequest, UpdateRoleRequest, body, query};
use crate::core::auth::{AuthLogic, issue_token};
use crate::core::oauth::CALLBACK_PATH;
use crate::core::policy::Principal;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::role::Role;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::Redirect;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

/// Cookie carrying the OAuth `state` between the redirect and the callback.
const STATE_COOKIE: &str = "staffclock_oauth_state";
const STATE_TTL_SECS: u32 = 600;
const GOOGLE_PATH: &str = "/api/auth/google";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/update-role", put(update_role))
        .route("/api/auth/logout", get(logout))
        .route(GOOGLE_PATH, get(google_start))
        .route(CALLBACK_PATH, get(google_callback))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let req = body(payload)?;

    let user = state
        .with_db(move |db| {
            AuthLogic::register(
                &db.conn,
                req.email.as_deref(),
                req.name.as_deref(),
                req.password.as_deref(),
            )
        })
        .await?;
    let token = issue_token(&user.id, &state.config)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully", "user": user, "token": token })),
    ))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let req = body(payload)?;

    let user = state
        .with_db(move |db| AuthLogic::login(&db.conn, req.email.as_deref(), req.password.as_deref()))
        .await?;
    let token = issue_token(&user.id, &state.config)?;
    tracing::info!(user_id = %user.id, "login");

    Ok(Json(json!({ "message": "Login successful", "user": user, "token": token })))
}

async fn me(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Value>> {
    let user = state
        .with_db(move |db| {
            queries::find_user_by_id(&db.conn, &principal.user_id)?.ok_or(AppError::NotFound)
        })
        .await?;
    Ok(Json(json!({ "user": user })))
}

async fn update_role(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let req = body(payload)?;

    let raw = req
        .role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::Validation("Role is required".into()))?;
    let role = Role::from_code(raw).ok_or_else(|| AppError::InvalidRole(raw.to_string()))?;
    let target = req.user_id.unwrap_or_else(|| principal.user_id.clone());

    let user = state
        .with_db(move |db| AuthLogic::change_role(&db.conn, &principal, &target, role))
        .await?;

    Ok(Json(json!({ "message": "Role updated", "user": user })))
}

/// Tokens are stateless; the client drops its copy.
async fn logout() -> Json<Value> {
    Json(json!({ "message": "Logged out" }))
}

// ---------------------------
// Google sign-in
// ---------------------------

fn state_cookie(value: &str, max_age: u32, secure: bool) -> String {
    let mut cookie = format!(
        "{STATE_COOKIE}={value}; Path={GOOGLE_PATH}; Max-Age={max_age}; HttpOnly; SameSite=Lax"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

async fn google_start(
    State(state): State<AppState>,
) -> AppResult<([(HeaderName, String); 1], Redirect)> {
    let provider = state.oauth.as_ref().ok_or(AppError::NotFound)?;

    let nonce = hex::encode(rand::random::<[u8; 16]>());
    let url = provider.authorize_url(&nonce)?;
    let secure = state.config.base_url.starts_with("https://");

    Ok((
        [(SET_COOKIE, state_cookie(&nonce, STATE_TTL_SECS, secure))],
        Redirect::to(&url),
    ))
}

async fn google_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<GoogleCallbackQuery>, QueryRejection>,
) -> AppResult<([(HeaderName, String); 1], Json<Value>)> {
    let provider = state.oauth.clone().ok_or(AppError::NotFound)?;
    let q = query(params)?;

    if let Some(err) = q.error {
        return Err(AppError::Validation(format!("Google sign-in failed: {err}")));
    }

    // The state echoed by the provider must match the one set on this browser.
    let expected = cookie_value(&headers, STATE_COOKIE).filter(|v| !v.is_empty());
    match (expected, q.state.as_deref()) {
        (Some(cookie), Some(returned)) if cookie == returned => {}
        _ => return Err(AppError::Validation("Invalid OAuth state".into())),
    }

    let code = q
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("Missing authorization code".into()))?;

    let identity = provider.exchange(&code).await?;

    let user = state
        .with_db(move |db| {
            AuthLogic::upsert_federated(&db.conn, &identity.email, identity.name.as_deref())
        })
        .await?;
    let token = issue_token(&user.id, &state.config)?;
    tracing::info!(user_id = %user.id, "google login");

    let secure = state.config.base_url.starts_with("https://");
    Ok((
        [(SET_COOKIE, state_cookie("", 0, secure))],
        Json(json!({ "message": "Login successful", "user": user, "token": token })),
    ))
}
