//! `compile` and `compile-checker` pipeline handlers (§4.4.1 / §4.4.2).

use uuid::Uuid;

use crate::error::HandlerError;
use crate::model::{ArtifactType, Handle, TaskResult};
use crate::sandbox::{CompileRequest, SandboxError};

use super::{read_artifact, PipelineContext};

pub async fn handle_compile(
    ctx: &PipelineContext,
    source_cache_id: &Handle,
    language: &str,
    is_checker: bool,
) -> Result<TaskResult, HandlerError> {
    let source_code = read_artifact(&ctx.cache, source_cache_id).await?;
    let submission_id = Uuid::new_v4().to_string();

    let outcome = ctx
        .sandbox
        .compile(CompileRequest {
            source_code,
            language: language.to_string(),
            submission_id,
            is_checker,
        })
        .await
        .map_err(sandbox_err_to_handler)?;

    if let Some(temp_dir) = &outcome.temp_dir {
        // Executable bytes are read before cleanup; the temp dir is owned by
        // the sandbox adapter, not this handler.
        if outcome.success {
            if let Some(exe_path) = &outcome.executable_path {
                let bytes = tokio::fs::read(exe_path).await.map_err(HandlerError::Io)?;
                let artifact_type = if is_checker {
                    ArtifactType::Checker
                } else {
                    ArtifactType::Binary
                };
                let entry = ctx
                    .cache
                    .put(artifact_type, &bytes, "program".to_string())
                    .await
                    .map_err(HandlerError::Io)?;
                ctx.sandbox.cleanup_temp_dir(temp_dir).await;
                return Ok(make_result(is_checker, true, outcome.compile_info, Some(entry.id)));
            }
        }
        ctx.sandbox.cleanup_temp_dir(temp_dir).await;
    }

    Ok(make_result(is_checker, false, outcome.compile_info, None))
}

fn make_result(
    is_checker: bool,
    success: bool,
    compile_info: String,
    handle: Option<Handle>,
) -> TaskResult {
    if is_checker {
        TaskResult::CompileChecker {
            success,
            compile_info,
            checker_cache_id: handle,
        }
    } else {
        TaskResult::Compile {
            success,
            compile_info,
            binary_cache_id: handle,
        }
    }
}

fn sandbox_err_to_handler(err: SandboxError) -> HandlerError {
    HandlerError::SandboxFailure(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ArtifactCache;
    use crate::sandbox::{
        CheckerOutcome, CompileOutcome, InteractiveOutcome, RunCheckerRequest,
        RunInteractiveRequest, RunProgramOutcome, RunProgramRequest, RunStatus, SandboxRuntime,
    };
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Arc;

    struct FakeSandbox {
        should_succeed: bool,
    }

    #[async_trait]
    impl SandboxRuntime for FakeSandbox {
        async fn compile(&self, _req: CompileRequest) -> Result<CompileOutcome, SandboxError> {
            let dir = tempfile::tempdir().unwrap().into_path();
            if self.should_succeed {
                let exe = dir.join("program");
                tokio::fs::write(&exe, b"fake-binary").await.unwrap();
                Ok(CompileOutcome {
                    success: true,
                    compile_info: String::new(),
                    executable_path: Some(exe),
                    temp_dir: Some(dir),
                })
            } else {
                Ok(CompileOutcome {
                    success: false,
                    compile_info: "error: expected ';'".to_string(),
                    executable_path: None,
                    temp_dir: Some(dir),
                })
            }
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
            unimplemented!()
        }

        async fn cleanup_temp_dir(&self, path: &PathBuf) {
            let _ = tokio::fs::remove_dir_all(path).await;
        }
    }

    async fn ctx_with(should_succeed: bool) -> (PipelineContext, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ArtifactCache::new(dir.path()));
        let ctx = PipelineContext {
            cache,
            sandbox: Arc::new(FakeSandbox { should_succeed }),
            scratch_root: dir.path().to_path_buf(),
        };
        (ctx, dir)
    }

    #[tokio::test]
    async fn successful_compile_publishes_binary_handle() {
        let (ctx, _dir) = ctx_with(true).await;
        let source = ctx
            .cache
            .put(ArtifactType::Source, b"int main(){}", "a.cpp".to_string())
            .await
            .unwrap();
        let result = handle_compile(&ctx, &source.id, "cpp", false).await.unwrap();
        match result {
            TaskResult::Compile {
                success,
                binary_cache_id,
                ..
            } => {
                assert!(success);
                assert!(binary_cache_id.is_some());
            }
            _ => panic!("expected Compile result"),
        }
    }

    #[tokio::test]
    async fn failed_compile_has_no_binary_handle() {
        let (ctx, _dir) = ctx_with(false).await;
        let source = ctx
            .cache
            .put(ArtifactType::Source, b"int main(){", "bad.cpp".to_string())
            .await
            .unwrap();
        let result = handle_compile(&ctx, &source.id, "cpp", false).await.unwrap();
        match result {
            TaskResult::Compile {
                success,
                binary_cache_id,
                compile_info,
            } => {
                assert!(!success);
                assert!(binary_cache_id.is_none());
                assert!(!compile_info.is_empty());
            }
            _ => panic!("expected Compile result"),
        }
    }

    #[tokio::test]
    async fn missing_source_handle_is_handler_error() {
        let (ctx, _dir) = ctx_with(true).await;
        let result = handle_compile(&ctx, &"missing".to_string(), "cpp", false).await;
        assert!(matches!(result, Err(HandlerError::ArtifactExpired(_))));
    }

    #[tokio::test]
    async fn compile_checker_publishes_checker_typed_handle() {
        let (ctx, _dir) = ctx_with(true).await;
        let source = ctx
            .cache
            .put(ArtifactType::Source, b"int main(){}", "chk.cpp".to_string())
            .await
            .unwrap();
        let result = handle_compile(&ctx, &source.id, "cpp", true).await.unwrap();
        match result {
            TaskResult::CompileChecker {
                success,
                checker_cache_id,
                ..
            } => {
                assert!(success);
                let id = checker_cache_id.unwrap();
                let lookup = ctx.cache.get(&id).await.unwrap();
                assert_eq!(lookup.metadata.file_name, "program");
            }
            _ => panic!("expected CompileChecker result"),
        }
    }
}
