//! Core data types: artifacts, tasks, and verdicts.
//!
//! Mirrors the teacher's `types.rs` shape — internally-tagged serde enums,
//! `Default` impls where a sensible default exists, and inline round-trip
//! tests per variant — generalized from one execution-result type into the
//! task/verdict sum types a typed port of this domain calls for.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Handle = String;

pub fn new_handle() -> Handle {
    Uuid::new_v4().to_string()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as u64
}

// ── Artifacts ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    Source,
    Binary,
    Input,
    Output,
    Checker,
}

impl ArtifactType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "source" => Some(ArtifactType::Source),
            "binary" => Some(ArtifactType::Binary),
            "input" => Some(ArtifactType::Input),
            "output" => Some(ArtifactType::Output),
            "checker" => Some(ArtifactType::Checker),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Source => "source",
            ArtifactType::Binary => "binary",
            ArtifactType::Input => "input",
            ArtifactType::Output => "output",
            ArtifactType::Checker => "checker",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub file_name: String,
    pub size: u64,
}

/// In-memory index entry for a cached artifact; the byte payload lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactEntry {
    pub id: Handle,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    pub metadata: ArtifactMetadata,
    pub created_at: u64,
    pub expires_at: u64,
}

impl ArtifactEntry {
    pub fn new(artifact_type: ArtifactType, metadata: ArtifactMetadata, ttl_ms: u64) -> Self {
        let created_at = now_millis();
        ArtifactEntry {
            id: new_handle(),
            artifact_type,
            metadata,
            created_at,
            expires_at: created_at + ttl_ms,
        }
    }

    pub fn is_live_at(&self, now_ms: u64) -> bool {
        now_ms <= self.expires_at
    }
}

// ── Checker identifier (dual-mode) ───────────────────────────────────────────

/// `checkerName` carries two meanings disambiguated by UUID syntax: a custom
/// checker compiled earlier (referenced by its cache handle) or the name of a
/// built-in testlib-style comparator materialized on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checker {
    Builtin(String),
    Custom(Handle),
}

pub const BUILTIN_CHECKER_NAMES: &[&str] = &[
    "icmp", "ncmp", "wcmp", "rcmp", "dcmp", "fcmp", "hcmp", "lcmp", "uncmp", "caseicmp",
    "casencmp", "casewcmp", "yesno", "nyesno", "rcmp4", "rcmp6", "rcmp9", "rncmp", "acmp",
];

impl Checker {
    pub fn parse(raw: &str) -> Checker {
        if Uuid::parse_str(raw).is_ok() {
            Checker::Custom(raw.to_string())
        } else {
            Checker::Builtin(raw.to_string())
        }
    }
}

// ── Tasks ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum TaskData {
    Compile {
        source_cache_id: Handle,
        #[serde(default = "default_language")]
        language: String,
    },
    CompileChecker {
        source_cache_id: Handle,
        #[serde(default = "default_language")]
        language: String,
    },
    Judge {
        binary_cache_id: Handle,
        input_cache_id: Handle,
        output_cache_id: Handle,
        checker_name: String,
        #[serde(default = "default_time_limit_ms")]
        time_limit: u64,
        #[serde(default = "default_memory_limit_kb")]
        memory_limit: u64,
        #[serde(default)]
        is_file_input: bool,
        #[serde(default = "default_input_file_name")]
        input_file_name: String,
        #[serde(default = "default_output_file_name")]
        output_file_name: String,
    },
    Run {
        binary_cache_id: Handle,
        input_cache_id: Handle,
        #[serde(default = "default_time_limit_ms")]
        time_limit: u64,
        #[serde(default = "default_memory_limit_kb")]
        memory_limit: u64,
        #[serde(default)]
        is_file_input: bool,
        #[serde(default = "default_input_file_name")]
        input_file_name: String,
        #[serde(default = "default_output_file_name")]
        output_file_name: String,
    },
    Interactive {
        user_binary_cache_id: Handle,
        interactor_binary_cache_id: Handle,
        #[serde(default = "default_time_limit_ms")]
        time_limit: u64,
        #[serde(default = "default_memory_limit_kb")]
        memory_limit: u64,
        #[serde(default = "default_interactor_time_limit_ms")]
        interactor_time_limit: u64,
        #[serde(default = "default_memory_limit_kb")]
        interactor_memory_limit: u64,
        input_cache_id: Option<Handle>,
        #[serde(default = "default_score_file_name")]
        score_file_name: String,
        #[serde(default = "default_message_file_name")]
        message_file_name: String,
    },
}

pub fn default_language() -> String {
    "cpp".to_string()
}
pub fn default_time_limit_ms() -> u64 {
    1000
}
pub fn default_memory_limit_kb() -> u64 {
    131072
}
pub fn default_interactor_time_limit_ms() -> u64 {
    5000
}
pub fn default_input_file_name() -> String {
    "input.txt".to_string()
}
pub fn default_output_file_name() -> String {
    "output.txt".to_string()
}
pub fn default_score_file_name() -> String {
    "score.txt".to_string()
}
pub fn default_message_file_name() -> String {
    "message.txt".to_string()
}

impl TaskData {
    pub fn type_name(&self) -> &'static str {
        match self {
            TaskData::Compile { .. } => "compile",
            TaskData::CompileChecker { .. } => "compile-checker",
            TaskData::Judge { .. } => "judge",
            TaskData::Run { .. } => "run",
            TaskData::Interactive { .. } => "interactive",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum TaskResult {
    Compile {
        success: bool,
        compile_info: String,
        binary_cache_id: Option<Handle>,
    },
    CompileChecker {
        success: bool,
        compile_info: String,
        checker_cache_id: Option<Handle>,
    },
    Judge {
        status: JudgeVerdict,
        score: f64,
        normalized_score: f64,
        time: u64,
        memory: u64,
        output: String,
        checker_message: Option<String>,
    },
    Run {
        status: RunVerdict,
        time: u64,
        memory: u64,
        output: String,
    },
    Interactive {
        verdict: InteractiveVerdict,
        score: f64,
        normalized_score: f64,
        message: Option<String>,
        reason: Option<String>,
        user_time: u64,
        user_memory: u64,
        interactor_time: u64,
        interactor_memory: u64,
        user_stderr: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JudgeVerdict {
    Accepted,
    PartialAccepted,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunVerdict {
    ExitedNormally,
    NonZeroExit,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractiveVerdict {
    Accepted,
    Partial,
    WrongAnswer,
    UserError,
    InteractorError,
    InvalidInteraction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Handle,
    pub priority: i64,
    pub status: TaskStatus,
    pub data: TaskData,
    pub result: Option<TaskResult>,
    pub error: Option<String>,
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
}

impl Task {
    pub fn new(data: TaskData, priority: i64) -> Self {
        Task {
            id: new_handle(),
            priority,
            status: TaskStatus::Pending,
            data,
            result: None,
            error: None,
            created_at: now_millis(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(now_millis());
    }

    pub fn mark_completed(&mut self, result: TaskResult) {
        self.result = Some(result);
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now_millis());
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.status = TaskStatus::Failed;
        self.completed_at = Some(now_millis());
    }
}

pub fn current_time_millis() -> u64 {
    now_millis()
}

pub type Tags = HashMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checker_parses_uuid_as_custom() {
        let id = Uuid::new_v4().to_string();
        assert_eq!(Checker::parse(&id), Checker::Custom(id));
    }

    #[test]
    fn checker_parses_name_as_builtin() {
        assert_eq!(
            Checker::parse("ncmp"),
            Checker::Builtin("ncmp".to_string())
        );
    }

    #[test]
    fn checker_malformed_uuid_falls_through_to_builtin() {
        assert_eq!(
            Checker::parse("not-a-uuid-at-all"),
            Checker::Builtin("not-a-uuid-at-all".to_string())
        );
    }

    #[test]
    fn task_lifecycle_transitions() {
        let mut task = Task::new(
            TaskData::Run {
                binary_cache_id: "a".to_string(),
                input_cache_id: "b".to_string(),
                time_limit: 1000,
                memory_limit: 131072,
                is_file_input: false,
                input_file_name: default_input_file_name(),
                output_file_name: default_output_file_name(),
            },
            0,
        );
        assert_eq!(task.status, TaskStatus::Pending);
        task.mark_running();
        assert_eq!(task.status, TaskStatus::Running);
        assert!(task.started_at.is_some());
        task.mark_completed(TaskResult::Run {
            status: RunVerdict::ExitedNormally,
            time: 10,
            memory: 100,
            output: String::new(),
        });
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.result.is_some());
        assert!(task.error.is_none());
    }

    #[test]
    fn task_data_round_trips_through_json() {
        let data = TaskData::Judge {
            binary_cache_id: "a".to_string(),
            input_cache_id: "b".to_string(),
            output_cache_id: "c".to_string(),
            checker_name: "ncmp".to_string(),
            time_limit: 1000,
            memory_limit: 131072,
            is_file_input: false,
            input_file_name: default_input_file_name(),
            output_file_name: default_output_file_name(),
        };
        let json = serde_json::to_string(&data).unwrap();
        let parsed: TaskData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.type_name(), "judge");
    }

    #[test]
    fn artifact_entry_expiry() {
        let entry = ArtifactEntry::new(
            ArtifactType::Source,
            ArtifactMetadata {
                file_name: "a.cpp".to_string(),
                size: 10,
            },
            300_000,
        );
        assert!(entry.is_live_at(entry.created_at));
        assert!(entry.is_live_at(entry.expires_at));
        assert!(!entry.is_live_at(entry.expires_at + 1));
    }
}
