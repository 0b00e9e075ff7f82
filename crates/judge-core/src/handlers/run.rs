//! `run` pipeline handler (§4.4.4): executes a binary against an input with
//! no checker phase.

use crate::error::HandlerError;
use crate::model::{RunVerdict, TaskData, TaskResult};
use crate::sandbox::{RunProgramRequest, RunStatus};
use crate::workdir::ScratchDir;

use super::{resolve_path, PipelineContext};

pub async fn handle_run(ctx: &PipelineContext, data: &TaskData) -> Result<TaskResult, HandlerError> {
    let TaskData::Run {
        binary_cache_id,
        input_cache_id,
        time_limit,
        memory_limit,
        is_file_input,
        input_file_name,
        output_file_name,
    } = data
    else {
        return Err(HandlerError::UnknownTaskType("run".to_string()));
    };

    let binary_path = resolve_path(&ctx.cache, binary_cache_id).await?;
    let input_path = resolve_path(&ctx.cache, input_cache_id).await?;

    let scratch = ScratchDir::new(&ctx.scratch_root, "run").map_err(HandlerError::Io)?;
    let staged_binary = scratch.join("program");
    tokio::fs::copy(&binary_path, &staged_binary)
        .await
        .map_err(HandlerError::Io)?;
    make_executable(&staged_binary).await?;

    let outcome = ctx
        .sandbox
        .run_program(RunProgramRequest {
            executable_path: staged_binary,
            input_path: Some(input_path),
            language: "cpp".to_string(),
            time_limit_ms: *time_limit,
            memory_limit_kb: *memory_limit,
            is_file_input: *is_file_input,
            input_file_name: input_file_name.clone(),
            output_file_name: output_file_name.clone(),
            work_dir: scratch.path().to_path_buf(),
        })
        .await
        .map_err(|e| HandlerError::SandboxFailure(e.to_string()))?;

    let status = match outcome.status {
        RunStatus::Exited if outcome.exit_code == 0 => RunVerdict::ExitedNormally,
        RunStatus::Exited => RunVerdict::NonZeroExit,
        RunStatus::TimeLimitExceeded => RunVerdict::TimeLimitExceeded,
        RunStatus::MemoryLimitExceeded => RunVerdict::MemoryLimitExceeded,
        RunStatus::Fault => RunVerdict::RuntimeError,
    };

    Ok(TaskResult::Run {
        status,
        time: outcome.time_ms,
        memory: outcome.memory_kb,
        output: outcome.stdout,
    })
}

pub(crate) async fn make_executable(path: &std::path::Path) -> Result<(), HandlerError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = tokio::fs::metadata(path)
            .await
            .map_err(HandlerError::Io)?
            .permissions();
        perms.set_mode(0o755);
        tokio::fs::set_permissions(path, perms)
            .await
            .map_err(HandlerError::Io)?;
    }
    let _ = path;
    Ok(())
}
