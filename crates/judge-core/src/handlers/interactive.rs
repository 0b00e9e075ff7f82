//! `interactive` pipeline handler (§4.4.5): runs a user program against an
//! interactor, both wired through the sandbox.

use crate::error::HandlerError;
use crate::model::{InteractiveVerdict, TaskData, TaskResult};
use crate::sandbox::{InteractiveVerdictKind, RunInteractiveRequest};
use crate::workdir::ScratchDir;

use super::run::make_executable;
use super::{resolve_path, PipelineContext};

pub async fn handle_interactive(
    ctx: &PipelineContext,
    data: &TaskData,
) -> Result<TaskResult, HandlerError> {
    let TaskData::Interactive {
        user_binary_cache_id,
        interactor_binary_cache_id,
        time_limit,
        memory_limit,
        interactor_time_limit,
        interactor_memory_limit,
        input_cache_id,
        score_file_name,
        message_file_name,
    } = data
    else {
        return Err(HandlerError::UnknownTaskType("interactive".to_string()));
    };

    let user_binary_path = resolve_path(&ctx.cache, user_binary_cache_id).await?;
    let interactor_binary_path = resolve_path(&ctx.cache, interactor_binary_cache_id).await?;
    let input_path = match input_cache_id {
        Some(handle) => Some(resolve_path(&ctx.cache, handle).await?),
        None => None,
    };

    let scratch = ScratchDir::new(&ctx.scratch_root, "interactive").map_err(HandlerError::Io)?;
    let staged_user = scratch.join("user");
    let staged_interactor = scratch.join("interactor");
    tokio::fs::copy(&user_binary_path, &staged_user)
        .await
        .map_err(HandlerError::Io)?;
    tokio::fs::copy(&interactor_binary_path, &staged_interactor)
        .await
        .map_err(HandlerError::Io)?;
    make_executable(&staged_user).await?;
    make_executable(&staged_interactor).await?;

    let outcome = ctx
        .sandbox
        .run_interactive(RunInteractiveRequest {
            user_executable_path: staged_user,
            interactor_executable_path: staged_interactor,
            time_limit_ms: *time_limit,
            memory_limit_kb: *memory_limit,
            interactor_time_limit_ms: *interactor_time_limit,
            interactor_memory_limit_kb: *interactor_memory_limit,
            interactor_input_path: input_path,
            score_file_name: score_file_name.clone(),
            message_file_name: message_file_name.clone(),
            work_dir: scratch.path().to_path_buf(),
        })
        .await
        .map_err(|e| HandlerError::SandboxFailure(e.to_string()))?;

    // A judging-infrastructure failure (e.g. the interactor crashed before
    // writing a score file) is not a contestant-facing verdict: it fails the
    // task instead of completing with a synthetic result (open question #3,
    // see DESIGN.md).
    if outcome.verdict == InteractiveVerdictKind::JudgementFailed {
        return Err(HandlerError::JudgementFailed(
            outcome
                .reason
                .unwrap_or_else(|| "interactor produced no usable verdict".to_string()),
        ));
    }

    let verdict = match outcome.verdict {
        InteractiveVerdictKind::Accepted => InteractiveVerdict::Accepted,
        InteractiveVerdictKind::Partial => InteractiveVerdict::Partial,
        InteractiveVerdictKind::WrongAnswer => InteractiveVerdict::WrongAnswer,
        InteractiveVerdictKind::UserError => InteractiveVerdict::UserError,
        InteractiveVerdictKind::InteractorError => InteractiveVerdict::InteractorError,
        InteractiveVerdictKind::InvalidInteraction => InteractiveVerdict::InvalidInteraction,
        InteractiveVerdictKind::JudgementFailed => unreachable!("handled above"),
    };

    Ok(TaskResult::Interactive {
        verdict,
        score: outcome.score,
        normalized_score: outcome.normalized_score,
        message: outcome.message,
        reason: outcome.reason,
        user_time: outcome.user_time_ms,
        user_memory: outcome.user_memory_kb,
        interactor_time: outcome.interactor_time_ms,
        interactor_memory: outcome.interactor_memory_kb,
        user_stderr: outcome.user_stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ArtifactCache;
    use crate::model::ArtifactType;
    use crate::sandbox::{
        CheckerOutcome, CompileOutcome, CompileRequest, InteractiveOutcome, RunCheckerRequest,
        RunProgramOutcome, RunProgramRequest, SandboxError, SandboxRuntime,
    };
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Arc;

    struct FakeInteractiveSandbox {
        outcome: InteractiveOutcome,
    }

    #[async_trait]
    impl SandboxRuntime for FakeInteractiveSandbox {
        async fn compile(&self, _req: CompileRequest) -> Result<CompileOutcome, SandboxError> {
            unimplemented!()
        }
        async fn compile_checker(&self, _name: &str) -> Result<PathBuf, SandboxError> {
            unimplemented!()
        }
        async fn run_program(
            &self,
            _req: RunProgramRequest,
        ) -> Result<RunProgramOutcome, SandboxError> {
            unimplemented!()
        }
        async fn run_checker(
            &self,
            _req: RunCheckerRequest,
        ) -> Result<CheckerOutcome, SandboxError> {
            unimplemented!()
        }
        async fn run_interactive(
            &self,
            _req: RunInteractiveRequest,
        ) -> Result<InteractiveOutcome, SandboxError> {
            Ok(self.outcome.clone())
        }
        async fn cleanup_temp_dir(&self, _path: &PathBuf) {}
    }

    async fn ctx_with(outcome: InteractiveOutcome) -> (PipelineContext, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ArtifactCache::new(dir.path()));
        let ctx = PipelineContext {
            cache,
            sandbox: Arc::new(FakeInteractiveSandbox { outcome }),
            scratch_root: dir.path().to_path_buf(),
        };
        (ctx, dir)
    }

    async fn seed(ctx: &PipelineContext) -> TaskData {
        let user = ctx
            .cache
            .put(ArtifactType::Binary, b"ELF-user", "user".to_string())
            .await
            .unwrap();
        let interactor = ctx
            .cache
            .put(ArtifactType::Binary, b"ELF-interactor", "interactor".to_string())
            .await
            .unwrap();
        let input = ctx
            .cache
            .put(ArtifactType::Input, b"42", "in.txt".to_string())
            .await
            .unwrap();
        TaskData::Interactive {
            user_binary_cache_id: user.id,
            interactor_binary_cache_id: interactor.id,
            time_limit: 1000,
            memory_limit: 131072,
            interactor_time_limit: 5000,
            interactor_memory_limit: 131072,
            input_cache_id: Some(input.id),
            score_file_name: "score.txt".to_string(),
            message_file_name: "message.txt".to_string(),
        }
    }

    #[tokio::test]
    async fn scenario_6_guessing_game_accepted() {
        let outcome = InteractiveOutcome {
            verdict: InteractiveVerdictKind::Accepted,
            score: 100.0,
            normalized_score: 1.0,
            message: Some("guessed 42".to_string()),
            reason: None,
            user_time_ms: 10,
            user_memory_kb: 100,
            interactor_time_ms: 5,
            interactor_memory_kb: 50,
            user_stderr: String::new(),
        };
        let (ctx, _dir) = ctx_with(outcome).await;
        let data = seed(&ctx).await;
        let result = handle_interactive(&ctx, &data).await.unwrap();
        match result {
            TaskResult::Interactive { verdict, .. } => {
                assert_eq!(verdict, InteractiveVerdict::Accepted)
            }
            _ => panic!("expected Interactive result"),
        }
    }

    #[tokio::test]
    async fn judgement_failed_becomes_handler_error_not_a_verdict() {
        let outcome = InteractiveOutcome {
            verdict: InteractiveVerdictKind::JudgementFailed,
            score: 0.0,
            normalized_score: 0.0,
            message: None,
            reason: Some("interactor crashed".to_string()),
            user_time_ms: 0,
            user_memory_kb: 0,
            interactor_time_ms: 0,
            interactor_memory_kb: 0,
            user_stderr: String::new(),
        };
        let (ctx, _dir) = ctx_with(outcome).await;
        let data = seed(&ctx).await;
        let result = handle_interactive(&ctx, &data).await;
        assert!(matches!(result, Err(HandlerError::JudgementFailed(_))));
    }
}
