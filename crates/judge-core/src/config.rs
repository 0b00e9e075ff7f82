//! Process-wide configuration, loaded once at startup.
//!
//! Every value has an env var as the source of truth (§6 of the spec); `clap`
//! lets each one be overridden by an equivalent flag for local development
//! without changing the wire contract of the deployed service.

use std::time::Duration;

use clap::Parser;

use crate::error::FatalError;

/// Artifact TTL: 5 minutes, fixed by the data model (not configurable).
pub const ARTIFACT_TTL: Duration = Duration::from_secs(300);

/// Cache sweep cadence must be <= TTL / 5.
pub const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Terminal task retention cap and sweep cadence.
pub const TASK_RETENTION_CAP: usize = 1000;
pub const TASK_RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser, Debug, Clone)]
#[command(name = "judge-server", about = "Online-judge evaluation server")]
pub struct Config {
    /// Shared auth token required on every route but /health.
    #[arg(long, env = "JUDGE_TOKEN")]
    pub token: Option<String>,

    /// Listen port.
    #[arg(long, env = "JUDGE_PORT", default_value_t = 3235)]
    pub port: u16,

    /// Bind address.
    #[arg(long, env = "JUDGE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Worker concurrency (>= 1).
    #[arg(long, env = "JUDGE_THREADS", default_value_t = 1)]
    pub threads: usize,

    /// Logger verbosity, forwarded to `tracing_subscriber::EnvFilter`.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Root directory for cached artifacts.
    #[arg(long, env = "JUDGE_CACHE_ROOT", default_value = "/tmp/judge-cache")]
    pub cache_root: String,

    /// Root directory under which ephemeral scratch dirs are created.
    #[arg(long, env = "JUDGE_SCRATCH_ROOT", default_value = "/tmp")]
    pub scratch_root: String,
}

impl Config {
    /// Parses configuration from process args/env, validating eagerly.
    pub fn from_env() -> Result<Self, FatalError> {
        let config = Config::parse();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), FatalError> {
        if self.token.as_deref().unwrap_or("").is_empty() {
            return Err(FatalError::Config("JUDGE_TOKEN is required".to_string()));
        }
        if self.threads < 1 {
            return Err(FatalError::Config(
                "JUDGE_THREADS must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn token(&self) -> &str {
        self.token.as_deref().unwrap_or("")
    }
}
