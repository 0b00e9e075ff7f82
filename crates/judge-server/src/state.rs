//! Shared application state threaded through every Axum handler.

use std::sync::Arc;
use std::time::Instant;

use judge_core::{ArtifactCache, Config, Scheduler, TaskRegistry};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<ArtifactCache>,
    pub registry: Arc<TaskRegistry>,
    pub scheduler: Arc<Scheduler>,
    pub started_at: Instant,
}

impl AppState {
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
