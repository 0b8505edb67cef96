use crate::errors::AppError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match &self {
            e if e.is_internal() => {
                tracing::error!(error = %e, "request failed");
                json!({ "error": "Internal server error" })
            }
            AppError::OutsidePerimeter { distance_meters } => json!({
                "error": self.to_string(),
                "distanceMeters": distance_meters,
            }),
            AppError::Token(e) => {
                tracing::debug!(error = %e, "token rejected");
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
