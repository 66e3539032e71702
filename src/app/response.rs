use crate::utils::error::{ErrorCategory, ServiceError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn status_for(error: &ServiceError) -> StatusCode {
    match error.category() {
        ErrorCategory::Client => StatusCode::BAD_REQUEST,
        ErrorCategory::Unavailable | ErrorCategory::Prediction | ErrorCategory::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let payload = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, payload).into_response()
    }
}
