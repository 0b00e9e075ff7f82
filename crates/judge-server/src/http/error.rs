//! Maps `judge_core`'s typed errors onto the `{error, statusCode}` JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use judge_core::ClientError;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(rename = "statusCode")]
    status_code: u16,
}

pub struct ApiError(pub ClientError);

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.0.status_code();
        let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: self.0.to_string(),
            status_code,
        };
        (status, Json(body)).into_response()
    }
}
