//! Task-submission and task/cache-lookup routes.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use judge_core::model::{
    default_input_file_name, default_interactor_time_limit_ms, default_language,
    default_memory_limit_kb, default_message_file_name, default_output_file_name,
    default_score_file_name, default_time_limit_ms,
};
use judge_core::{ClientError, Handle, Task, TaskData};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::http::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct TaskSubmittedResponse {
    #[serde(rename = "taskId")]
    task_id: Handle,
    status: &'static str,
}

fn submitted(task: Task) -> Json<TaskSubmittedResponse> {
    Json(TaskSubmittedResponse {
        task_id: task.id,
        status: "pending",
    })
}

async fn require_handle(state: &AppState, handle: &Handle) -> Result<(), ApiError> {
    if state.cache.has(handle) {
        Ok(())
    } else {
        Err(ApiError(ClientError::InvalidReference(handle.clone())))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileBody {
    source_cache_id: Handle,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    priority: i64,
}

pub async fn compile(
    State(state): State<AppState>,
    Json(body): Json<CompileBody>,
) -> Result<Json<TaskSubmittedResponse>, ApiError> {
    require_handle(&state, &body.source_cache_id).await?;
    let task = state.scheduler.submit(
        TaskData::Compile {
            source_cache_id: body.source_cache_id,
            language: body.language,
        },
        body.priority,
    );
    info!(task_id = %task.id, "compile task submitted");
    Ok(submitted(task))
}

pub async fn compile_checker(
    State(state): State<AppState>,
    Json(body): Json<CompileBody>,
) -> Result<Json<TaskSubmittedResponse>, ApiError> {
    require_handle(&state, &body.source_cache_id).await?;
    let task = state.scheduler.submit(
        TaskData::CompileChecker {
            source_cache_id: body.source_cache_id,
            language: body.language,
        },
        body.priority,
    );
    info!(task_id = %task.id, "compile-checker task submitted");
    Ok(submitted(task))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeBody {
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
    #[serde(default)]
    priority: i64,
}

pub async fn judge(
    State(state): State<AppState>,
    Json(body): Json<JudgeBody>,
) -> Result<Json<TaskSubmittedResponse>, ApiError> {
    require_handle(&state, &body.binary_cache_id).await?;
    require_handle(&state, &body.input_cache_id).await?;
    require_handle(&state, &body.output_cache_id).await?;
    let task = state.scheduler.submit(
        TaskData::Judge {
            binary_cache_id: body.binary_cache_id,
            input_cache_id: body.input_cache_id,
            output_cache_id: body.output_cache_id,
            checker_name: body.checker_name,
            time_limit: body.time_limit,
            memory_limit: body.memory_limit,
            is_file_input: body.is_file_input,
            input_file_name: body.input_file_name,
            output_file_name: body.output_file_name,
        },
        body.priority,
    );
    info!(task_id = %task.id, "judge task submitted");
    Ok(submitted(task))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunBody {
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
    #[serde(default)]
    priority: i64,
}

pub async fn run(
    State(state): State<AppState>,
    Json(body): Json<RunBody>,
) -> Result<Json<TaskSubmittedResponse>, ApiError> {
    require_handle(&state, &body.binary_cache_id).await?;
    require_handle(&state, &body.input_cache_id).await?;
    let task = state.scheduler.submit(
        TaskData::Run {
            binary_cache_id: body.binary_cache_id,
            input_cache_id: body.input_cache_id,
            time_limit: body.time_limit,
            memory_limit: body.memory_limit,
            is_file_input: body.is_file_input,
            input_file_name: body.input_file_name,
            output_file_name: body.output_file_name,
        },
        body.priority,
    );
    info!(task_id = %task.id, "run task submitted");
    Ok(submitted(task))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveBody {
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
    #[serde(default)]
    input_cache_id: Option<Handle>,
    #[serde(default = "default_score_file_name")]
    score_file_name: String,
    #[serde(default = "default_message_file_name")]
    message_file_name: String,
    #[serde(default)]
    priority: i64,
}

pub async fn interactive(
    State(state): State<AppState>,
    Json(body): Json<InteractiveBody>,
) -> Result<Json<TaskSubmittedResponse>, ApiError> {
    require_handle(&state, &body.user_binary_cache_id).await?;
    require_handle(&state, &body.interactor_binary_cache_id).await?;
    if let Some(handle) = &body.input_cache_id {
        require_handle(&state, handle).await?;
    }
    let task = state.scheduler.submit(
        TaskData::Interactive {
            user_binary_cache_id: body.user_binary_cache_id,
            interactor_binary_cache_id: body.interactor_binary_cache_id,
            time_limit: body.time_limit,
            memory_limit: body.memory_limit,
            interactor_time_limit: body.interactor_time_limit,
            interactor_memory_limit: body.interactor_memory_limit,
            input_cache_id: body.input_cache_id,
            score_file_name: body.score_file_name,
            message_file_name: body.message_file_name,
        },
        body.priority,
    );
    info!(task_id = %task.id, "interactive task submitted");
    Ok(submitted(task))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Handle>,
) -> Result<Json<Task>, ApiError> {
    state
        .registry
        .get(&id)
        .map(Json)
        .ok_or_else(|| ApiError(ClientError::TaskNotFound(id)))
}

pub async fn get_cache_entry(
    State(state): State<AppState>,
    Path(id): Path<Handle>,
) -> Result<Response, ApiError> {
    let lookup = state
        .cache
        .get(&id)
        .await
        .ok_or_else(|| ApiError(ClientError::ArtifactNotFound(id.clone())))?;

    let file = tokio::fs::File::open(&lookup.file_path)
        .await
        .map_err(|_| ApiError(ClientError::ArtifactNotFound(id)))?;
    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    Ok(Response::builder()
        .header(header::CONTENT_DISPOSITION, format!(
            "attachment; filename=\"{}\"",
            lookup.metadata.file_name
        ))
        .body(body)
        .unwrap()
        .into_response())
}
