use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::application::errors::BillingError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

pub fn error_response(error: &BillingError) -> Response {
    let status = error.status_code();
    // Don't leak internal error detail to clients.
    let message = if status.is_server_error() {
        "internal server error".to_string()
    } else {
        error.to_string()
    };

    (
        status,
        Json(ErrorResponse {
            code: status.as_u16(),
            message,
        }),
    )
        .into_response()
}
