//! `POST /upload`: stores raw bytes under an artifact type, returns a handle.

use axum::extract::{Multipart, State};
use axum::Json;
use judge_core::{ArtifactType, ClientError};
use serde::Serialize;
use tracing::info;

use crate::http::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    #[serde(rename = "cacheId")]
    cache_id: String,
    #[serde(rename = "fileName")]
    file_name: String,
    #[serde(rename = "type")]
    artifact_type: String,
    size: u64,
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name = "upload".to_string();
    let mut artifact_type = ArtifactType::Source;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError(ClientError::MissingUploadFile))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                if let Some(name) = field.file_name() {
                    file_name = name.to_string();
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError(ClientError::MissingUploadFile))?;
                file_bytes = Some(bytes.to_vec());
            }
            "type" => {
                let text = field.text().await.unwrap_or_default();
                artifact_type = ArtifactType::parse(&text)
                    .ok_or_else(|| ApiError(ClientError::InvalidArtifactType(text)))?;
            }
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| ApiError(ClientError::MissingUploadFile))?;

    const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError(ClientError::PayloadTooLarge {
            max_bytes: MAX_UPLOAD_BYTES,
        }));
    }

    let entry = state
        .cache
        .put(artifact_type, &bytes, file_name.clone())
        .await
        .map_err(|_| ApiError(ClientError::InvalidValue {
            field: "file",
            reason: "failed to persist upload".to_string(),
        }))?;

    info!(cache_id = %entry.id, artifact_type = artifact_type.as_str(), size = entry.metadata.size, "artifact uploaded");

    Ok(Json(UploadResponse {
        cache_id: entry.id,
        file_name,
        artifact_type: artifact_type.as_str().to_string(),
        size: entry.metadata.size,
        expires_in: 300,
    }))
}
