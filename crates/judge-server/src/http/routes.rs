//! Route table (§6): wires every handler behind the shared-token middleware,
//! except `/health`.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::http::{auth, status, tasks, upload};
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/upload", post(upload::upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .route("/compile", post(tasks::compile))
        .route("/compile/checker", post(tasks::compile_checker))
        .route("/judge", post(tasks::judge))
        .route("/run", post(tasks::run))
        .route("/interactive", post(tasks::interactive))
        .route("/task/:id", get(tasks::get_task))
        .route("/cache/:id", get(tasks::get_cache_entry))
        .route("/status", get(status::status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ));

    Router::new()
        .route("/health", get(status::health))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
