//! Shared-token auth middleware: `X-Auth-Token` header or `?token=` query param.

use axum::extract::{Query, Request, State};
use axum::http::header::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use judge_core::ClientError;
use serde::Deserialize;

use crate::http::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TokenQuery {
    token: Option<String>,
}

fn extract_token(headers: &HeaderMap, query: &TokenQuery) -> Option<String> {
    headers
        .get("x-auth-token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| query.token.clone())
}

pub async fn require_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = extract_token(request.headers(), &query);
    match provided {
        Some(token) if token == state.config.token() => Ok(next.run(request).await),
        _ => Err(ApiError(ClientError::Unauthorized)),
    }
}
