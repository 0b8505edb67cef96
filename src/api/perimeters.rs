use crate::api::AppState;
use crate::api::dto::{WithinQuery, body, path, query};
use crate::core::geo::{WithinCheck, point_from_inputs};
use crate::core::perimeters::{PerimeterInput, PerimeterLogic};
use crate::core::policy::Principal;
use crate::errors::AppResult;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/perimeters", get(list).post(create))
        .route("/api/perimeters/check/within", get(within))
        .route(
            "/api/perimeters/{id}",
            get(fetch).put(update).delete(remove),
        )
}

async fn create(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<PerimeterInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let input = body(payload)?;
    let perimeter = state
        .with_db(move |db| PerimeterLogic::create(&db.conn, &principal, input))
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "perimeter": perimeter }))))
}

async fn list(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Value>> {
    let perimeters = state
        .with_db(move |db| PerimeterLogic::list(&db.conn, &principal))
        .await?;
    Ok(Json(json!({ "perimeters": perimeters })))
}

async fn fetch(
    State(state): State<AppState>,
    principal: Principal,
    id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<Value>> {
    let id = path(id)?;
    let perimeter = state
        .with_db(move |db| PerimeterLogic::get(&db.conn, &principal, &id))
        .await?;
    Ok(Json(json!({ "perimeter": perimeter })))
}

async fn update(
    State(state): State<AppState>,
    principal: Principal,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<PerimeterInput>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let id = path(id)?;
    let input = body(payload)?;
    let perimeter = state
        .with_db(move |db| PerimeterLogic::update(&db.conn, &principal, &id, input))
        .await?;
    Ok(Json(json!({ "perimeter": perimeter })))
}

async fn remove(
    State(state): State<AppState>,
    principal: Principal,
    id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<Value>> {
    let id = path(id)?;
    state
        .with_db(move |db| PerimeterLogic::delete(&db.conn, &principal, &id))
        .await?;
    Ok(Json(json!({ "message": "Perimeter deleted" })))
}

/// Any authenticated user may check where they stand.
async fn within(
    State(state): State<AppState>,
    _principal: Principal,
    params: Result<Query<WithinQuery>, QueryRejection>,
) -> AppResult<Json<WithinCheck>> {
    let q = query(params)?;
    let lat = q.latitude.map(Value::String);
    let lon = q.longitude.map(Value::String);
    let point = point_from_inputs(lat.as_ref(), lon.as_ref())?;

    let check = state
        .with_db(move |db| PerimeterLogic::check_within(&db.conn, point))
        .await?;
    Ok(Json(check))
}
