//! `GET /health` and `GET /status`: unauthenticated liveness + authenticated
//! operational snapshot.

use axum::extract::State;
use axum::Json;
use judge_core::cache::CacheStats;
use judge_core::model::current_time_millis;
use judge_core::SchedulerStatus;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: u64,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: current_time_millis(),
    })
}

#[derive(Serialize)]
pub struct StatusBody {
    queue: SchedulerStatus,
    cache: CacheStats,
    uptime: u64,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusBody> {
    Json(StatusBody {
        queue: state.scheduler.status(),
        cache: state.cache.stats(),
        uptime: state.uptime_seconds(),
    })
}
