//! `judge` pipeline handler (§4.4.3): runs a binary, then checks its output.

use crate::error::HandlerError;
use crate::model::{Checker, JudgeVerdict, TaskData, TaskResult};
use crate::sandbox::{RunCheckerRequest, RunProgramRequest, RunStatus};
use crate::workdir::ScratchDir;

use super::run::make_executable;
use super::{resolve_path, PipelineContext};

pub async fn handle_judge(
    ctx: &PipelineContext,
    data: &TaskData,
) -> Result<TaskResult, HandlerError> {
    let TaskData::Judge {
        binary_cache_id,
        input_cache_id,
        output_cache_id,
        checker_name,
        time_limit,
        memory_limit,
        is_file_input,
        input_file_name,
        output_file_name,
    } = data
    else {
        return Err(HandlerError::UnknownTaskType("judge".to_string()));
    };

    let binary_path = resolve_path(&ctx.cache, binary_cache_id).await?;
    let input_path = resolve_path(&ctx.cache, input_cache_id).await?;
    let answer_path = resolve_path(&ctx.cache, output_cache_id).await?;

    let scratch = ScratchDir::new(&ctx.scratch_root, "judge").map_err(HandlerError::Io)?;
    let staged_binary = scratch.join("program");
    tokio::fs::copy(&binary_path, &staged_binary)
        .await
        .map_err(HandlerError::Io)?;
    make_executable(&staged_binary).await?;

    let run_outcome = ctx
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

    let early_verdict = match run_outcome.status {
        RunStatus::Exited if run_outcome.exit_code == 0 => None,
        RunStatus::TimeLimitExceeded => Some(JudgeVerdict::TimeLimitExceeded),
        RunStatus::MemoryLimitExceeded => Some(JudgeVerdict::MemoryLimitExceeded),
        _ => Some(JudgeVerdict::RuntimeError),
    };

    if let Some(status) = early_verdict {
        return Ok(TaskResult::Judge {
            status,
            score: 0.0,
            normalized_score: 0.0,
            time: run_outcome.time_ms,
            memory: run_outcome.memory_kb,
            output: run_outcome.stdout,
            checker_message: None,
        });
    }

    let output_path = scratch.join("output.txt");
    tokio::fs::write(&output_path, &run_outcome.stdout)
        .await
        .map_err(HandlerError::Io)?;

    let checker_outcome = match Checker::parse(checker_name) {
        Checker::Builtin(name) => {
            crate::sandbox::checkers::run_builtin_checker(&name, &run_outcome.stdout, &read_to_string(&answer_path).await?)
                .ok_or_else(|| HandlerError::SandboxFailure(format!("unknown builtin checker '{name}'")))?
        }
        Checker::Custom(handle) => {
            let checker_path = resolve_path(&ctx.cache, &handle).await?;
            ctx.sandbox
                .run_checker(RunCheckerRequest {
                    checker_path,
                    input_path: scratch.join("input_ref.txt"),
                    output_path: output_path.clone(),
                    answer_path: answer_path.clone(),
                    use_testlib: true,
                })
                .await
                .map_err(|e| HandlerError::SandboxFailure(e.to_string()))?
        }
    };

    let normalized_score = checker_outcome.normalized_score.clamp(0.0, 1.0);
    let status = if normalized_score >= 1.0 {
        JudgeVerdict::Accepted
    } else if normalized_score > 0.0 {
        JudgeVerdict::PartialAccepted
    } else {
        JudgeVerdict::WrongAnswer
    };

    Ok(TaskResult::Judge {
        status,
        score: checker_outcome.score,
        normalized_score,
        time: run_outcome.time_ms,
        memory: run_outcome.memory_kb,
        output: run_outcome.stdout,
        checker_message: Some(checker_outcome.message),
    })
}

async fn read_to_string(path: &std::path::Path) -> Result<String, HandlerError> {
    tokio::fs::read_to_string(path).await.map_err(HandlerError::Io)
}
