//! Request bodies and query strings. Every field is optional so missing
//! input surfaces as a validation error instead of an extractor rejection.

use crate::errors::{AppError, AppResult};
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use serde::Deserialize;
use serde_json::Value;

pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| AppError::Validation(e.body_text()))
}

pub fn query<T>(params: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    params
        .map(|Query(v)| v)
        .map_err(|e| AppError::Validation(e.body_text()))
}

pub fn path<T>(segment: Result<Path<T>, PathRejection>) -> AppResult<T> {
    segment
        .map(|Path(v)| v)
        .map_err(|e| AppError::Validation(e.body_text()))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub role: Option<String>,
    /// Defaults to the caller.
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClockRequest {
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub days: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WithinQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}
