//! Error taxonomy for the judge core.
//!
//! Three shapes, matching distinct points in the request/task lifecycle:
//! - [`ClientError`] — a malformed or unauthenticated HTTP request; surfaced as 4xx.
//! - [`HandlerError`] — a pipeline handler couldn't produce a verdict at all (as
//!   opposed to producing a verdict like "wrong answer", which is success, not error).
//! - [`FatalError`] — the process cannot continue; causes a non-zero exit.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("artifact {0} not found or expired")]
    ArtifactNotFound(String),

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("referenced handle {0} not found or expired")]
    InvalidReference(String),

    #[error("invalid artifact type: {0}")]
    InvalidArtifactType(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    #[error("no file part in upload")]
    MissingUploadFile,

    #[error("unauthorized")]
    Unauthorized,

    #[error("upload exceeds maximum size of {max_bytes} bytes")]
    PayloadTooLarge { max_bytes: usize },
}

impl ClientError {
    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            ClientError::Unauthorized => 401,
            ClientError::ArtifactNotFound(_) | ClientError::TaskNotFound(_) => 404,
            ClientError::PayloadTooLarge { .. } => 413,
            _ => 400,
        }
    }
}

/// Raised by a pipeline handler when it cannot produce any verdict: the task
/// transitions to `failed` and this error's `Display` string becomes `task.error`.
///
/// This is distinct from a handler *succeeding* with an unfavorable verdict
/// (wrong answer, time-limit-exceeded, compile failure) — those are `Ok(_)`
/// results, not `HandlerError`.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("artifact {0} not found or expired")]
    ArtifactExpired(String),

    #[error("unrecognized task type: {0}")]
    UnknownTaskType(String),

    #[error("sandbox adapter failure: {0}")]
    SandboxFailure(String),

    #[error("filesystem error while staging task: {0}")]
    Io(#[from] std::io::Error),

    #[error("judging infrastructure failure: {0}")]
    JudgementFailed(String),
}

/// Unrecoverable startup/runtime condition; the process exits after logging this.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("cache root {0} is not writable: {1}")]
    CacheRootUnwritable(String, std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to bind listener on {0}: {1}")]
    ListenerBind(String, std::io::Error),
}

/// True if retrying the same request might succeed without operator action
/// (as opposed to a permanently malformed request).
pub fn is_retryable_client_error(err: &ClientError) -> bool {
    matches!(
        err,
        ClientError::ArtifactNotFound(_)
            | ClientError::TaskNotFound(_)
            | ClientError::InvalidReference(_)
    )
}
