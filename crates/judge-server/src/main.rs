use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use judge_core::{ArtifactCache, Config, PipelineContext, ProcessSandbox, Scheduler, TaskRegistry};
use judge_server::http;
use judge_server::state::AppState;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fatal: {err}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(config.log_level.clone()))
        .init();

    if let Err(err) = run(config).await {
        error!("fatal: {err}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), judge_core::FatalError> {
    let config = Arc::new(config);

    tokio::fs::create_dir_all(&config.cache_root)
        .await
        .map_err(|e| judge_core::FatalError::CacheRootUnwritable(config.cache_root.clone(), e))?;

    let cache = Arc::new(ArtifactCache::new(PathBuf::from(&config.cache_root)));
    let registry = Arc::new(TaskRegistry::new());
    let ctx = Arc::new(PipelineContext {
        cache: Arc::clone(&cache),
        sandbox: Arc::new(ProcessSandbox::new()),
        scratch_root: PathBuf::from(&config.scratch_root),
    });
    let scheduler = Scheduler::new(Arc::clone(&registry), ctx, config.threads);

    let cancel = CancellationToken::new();
    let cache_sweeper = tokio::spawn(ArtifactCache::run_sweeper(
        Arc::clone(&cache),
        cancel.clone(),
    ));
    let retention_sweeper = tokio::spawn(TaskRegistry::run_retention_sweeper(
        Arc::clone(&registry),
        cancel.clone(),
    ));

    let state = AppState {
        config: Arc::clone(&config),
        cache,
        registry,
        scheduler,
        started_at: Instant::now(),
    };

    let app = http::routes::build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| judge_core::FatalError::ListenerBind(addr.clone(), e))?;

    info!("judge-server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| judge_core::FatalError::ListenerBind(addr, e))?;

    cancel.cancel();
    let _ = cache_sweeper.await;
    let _ = retention_sweeper.await;
    info!("judge-server shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining");
}
