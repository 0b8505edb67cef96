use crate::api::AppState;
use crate::api::dto::{ClockRequest, DashboardQuery, LogsQuery, body, path, query};
use crate::core::calculator::aggregate::Dashboard;
use crate::core::clock::ClockLogic;
use crate::core::geo::{parse_coordinate, validate_coordinate};
use crate::core::policy::Principal;
use crate::core::report::ReportLogic;
use crate::errors::AppResult;
use crate::models::location::GeoPoint;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/clock/clock-in", post(clock_in))
        .route("/api/clock/clock-out", post(clock_out))
        .route("/api/clock/active-staff", get(active_staff))
        .route("/api/clock/user/{user_id}/logs", get(user_logs))
        .route("/api/clock/dashboard", get(dashboard))
}

fn point_of(req: &ClockRequest) -> AppResult<GeoPoint> {
    validate_coordinate(GeoPoint::new(
        parse_coordinate(req.latitude.as_ref()),
        parse_coordinate(req.longitude.as_ref()),
    ))
}

async fn clock_in(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<ClockRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let req = body(payload)?;
    let point = point_of(&req)?;

    let user_id = principal.user_id.clone();
    let record = state
        .with_db(move |db| {
            ClockLogic::clock_in(&mut db.conn, &principal.user_id, point, req.note.as_deref())
        })
        .await?;
    tracing::info!(%user_id, record_id = %record.id, "clock-in");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Clocked in", "record": record })),
    ))
}

async fn clock_out(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<ClockRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let req = body(payload)?;
    let point = point_of(&req)?;

    let user_id = principal.user_id.clone();
    let record = state
        .with_db(move |db| {
            ClockLogic::clock_out(&mut db.conn, &principal.user_id, point, req.note.as_deref())
        })
        .await?;
    tracing::info!(%user_id, record_id = %record.id, "clock-out");

    Ok(Json(json!({ "message": "Clocked out", "record": record })))
}

async fn active_staff(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Value>> {
    let active = state
        .with_db(move |db| ReportLogic::active_staff(&db.conn, &principal))
        .await?;
    Ok(Json(json!({ "active": active })))
}

async fn user_logs(
    State(state): State<AppState>,
    principal: Principal,
    user_id: Result<Path<String>, PathRejection>,
    params: Result<Query<LogsQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let user_id = path(user_id)?;
    let q = query(params)?;

    let records = state
        .with_db(move |db| {
            ReportLogic::user_logs(
                &db.conn,
                &principal,
                &user_id,
                q.from.as_deref(),
                q.to.as_deref(),
            )
        })
        .await?;
    Ok(Json(json!({ "records": records })))
}

async fn dashboard(
    State(state): State<AppState>,
    principal: Principal,
    params: Result<Query<DashboardQuery>, QueryRejection>,
) -> AppResult<Json<Dashboard>> {
    let q = query(params)?;

    let dash = state
        .with_db(move |db| {
            ReportLogic::dashboard(
                &db.conn,
                &principal,
                q.days.as_deref(),
                q.from.as_deref(),
                q.to.as_deref(),
                Utc::now(),
            )
        })
        .await?;
    Ok(Json(dash))
}
