//! Pipeline handlers (§4.4): the glue between the cache, the sandbox, and
//! verdict synthesis.
//!
//! Grounded on the teacher's `executor.rs` top-level orchestration shape —
//! resolve inputs, stage them, dispatch to the engine, assemble a typed
//! result, with explicit branches for each edge case — generalized here from
//! "one Python execution" to "one judging pipeline" per task type.

pub mod compile;
pub mod interactive;
pub mod judge;
pub mod run;

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::ArtifactCache;
use crate::error::HandlerError;
use crate::model::{Handle, Task, TaskData, TaskResult};
use crate::sandbox::SandboxRuntime;

/// Shared context every handler needs: the cache to resolve/publish
/// artifacts through, the sandbox to delegate compilation/execution to, and
/// where to allocate scratch directories.
pub struct PipelineContext {
    pub cache: Arc<ArtifactCache>,
    pub sandbox: Arc<dyn SandboxRuntime>,
    pub scratch_root: PathBuf,
}

/// Reads an artifact's bytes out of the cache, translating a missing/expired
/// handle into the handler-level error the scheduler turns into `failed`.
pub(crate) async fn read_artifact(
    cache: &ArtifactCache,
    handle: &Handle,
) -> Result<Vec<u8>, HandlerError> {
    let lookup = cache
        .get(handle)
        .await
        .ok_or_else(|| HandlerError::ArtifactExpired(handle.clone()))?;
    tokio::fs::read(&lookup.file_path)
        .await
        .map_err(HandlerError::Io)
}

pub(crate) async fn resolve_path(
    cache: &ArtifactCache,
    handle: &Handle,
) -> Result<PathBuf, HandlerError> {
    let lookup = cache
        .get(handle)
        .await
        .ok_or_else(|| HandlerError::ArtifactExpired(handle.clone()))?;
    Ok(lookup.file_path)
}

/// Single entry point the scheduler calls for every task. Dispatches on
/// `TaskData`'s variant (the typed equivalent of the source's string -> fn
/// handler map, per the redesign guidance in SPEC_FULL.md §9).
pub async fn run_handler(task: &Task, ctx: &PipelineContext) -> Result<TaskResult, HandlerError> {
    match &task.data {
        TaskData::Compile {
            source_cache_id,
            language,
        } => compile::handle_compile(ctx, source_cache_id, language, false).await,
        TaskData::CompileChecker {
            source_cache_id,
            language,
        } => compile::handle_compile(ctx, source_cache_id, language, true).await,
        TaskData::Judge { .. } => judge::handle_judge(ctx, &task.data).await,
        TaskData::Run { .. } => run::handle_run(ctx, &task.data).await,
        TaskData::Interactive { .. } => interactive::handle_interactive(ctx, &task.data).await,
    }
}
