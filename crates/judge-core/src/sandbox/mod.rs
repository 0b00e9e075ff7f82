//! The sandbox boundary (§4.5 of the spec): the narrow set of operations the
//! judging pipelines consume from an external execution sandbox.
//!
//! Grounded on the teacher's `vm.rs` framing — that file's doc comments
//! explain *why* the VM is wrapped behind a narrow interface rather than
//! called inline (it names three architectural options and picks one). The
//! same reasoning motivates `SandboxRuntime` here: the concrete sandbox that
//! actually enforces isolation is expected to be swapped in by an operator
//! hardening this deployment, so the pipelines in `handlers/` only ever see
//! this trait, never a concrete compiler/process invocation.
//!
//! [`process::ProcessSandbox`] is the one concrete implementation this crate
//! ships: it shells out to a real toolchain and applies best-effort limits,
//! enough to make the server runnable standalone. It is not a security
//! boundary (see the Non-goals in SPEC_FULL.md §1).

pub mod checkers;
pub mod process;

use std::path::PathBuf;

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub source_code: Vec<u8>,
    pub language: String,
    pub submission_id: String,
    pub is_checker: bool,
}

#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub success: bool,
    pub compile_info: String,
    pub executable_path: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
}

/// `status` mirrors the sandbox's wire encoding: 1=exited, 2=TLE, 3=MLE,
/// anything else=fault (segfault, signal, spawn failure, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Exited,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    Fault,
}

#[derive(Debug, Clone)]
pub struct RunProgramRequest {
    pub executable_path: PathBuf,
    pub input_path: Option<PathBuf>,
    pub language: String,
    pub time_limit_ms: u64,
    pub memory_limit_kb: u64,
    pub is_file_input: bool,
    pub input_file_name: String,
    pub output_file_name: String,
    pub work_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RunProgramOutcome {
    pub status: RunStatus,
    pub exit_code: i32,
    pub time_ms: u64,
    pub memory_kb: u64,
    pub stdout: String,
    pub stderr: String,
}

pub struct RunCheckerRequest {
    pub checker_path: PathBuf,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub answer_path: PathBuf,
    pub use_testlib: bool,
}

#[derive(Debug, Clone)]
pub struct CheckerOutcome {
    pub score: f64,
    pub normalized_score: f64,
    pub message: String,
}

pub struct RunInteractiveRequest {
    pub user_executable_path: PathBuf,
    pub interactor_executable_path: PathBuf,
    pub time_limit_ms: u64,
    pub memory_limit_kb: u64,
    pub interactor_time_limit_ms: u64,
    pub interactor_memory_limit_kb: u64,
    pub interactor_input_path: Option<PathBuf>,
    pub score_file_name: String,
    pub message_file_name: String,
    pub work_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractiveVerdictKind {
    Accepted,
    Partial,
    WrongAnswer,
    UserError,
    InteractorError,
    InvalidInteraction,
    JudgementFailed,
}

#[derive(Debug, Clone)]
pub struct InteractiveOutcome {
    pub verdict: InteractiveVerdictKind,
    pub score: f64,
    pub normalized_score: f64,
    pub message: Option<String>,
    pub reason: Option<String>,
    pub user_time_ms: u64,
    pub user_memory_kb: u64,
    pub interactor_time_ms: u64,
    pub interactor_memory_kb: u64,
    pub user_stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("toolchain unavailable for language {0}")]
    UnsupportedLanguage(String),
    #[error("unknown built-in checker: {0}")]
    UnknownBuiltinChecker(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait SandboxRuntime: Send + Sync {
    async fn compile(&self, req: CompileRequest) -> Result<CompileOutcome, SandboxError>;

    async fn compile_checker(&self, builtin_name: &str) -> Result<PathBuf, SandboxError>;

    async fn run_program(
        &self,
        req: RunProgramRequest,
    ) -> Result<RunProgramOutcome, SandboxError>;

    async fn run_checker(&self, req: RunCheckerRequest) -> Result<CheckerOutcome, SandboxError>;

    async fn run_interactive(
        &self,
        req: RunInteractiveRequest,
    ) -> Result<InteractiveOutcome, SandboxError>;

    async fn cleanup_temp_dir(&self, path: &PathBuf);
}
