//! Upload and retrieval routes.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::services::storage::StorageError;
use crate::state::AppState;

pub const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

const UPLOAD_FIELD: &str = "file";
const FALLBACK_ORIGINAL_NAME: &str = "presentation";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub url: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub name: Option<String>,
}

/// `POST /upload`: store the multipart `file` field and return its retrieval URL.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadReceipt>, (StatusCode, &'static str)> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!(error = %e, "malformed multipart body");
        (StatusCode::BAD_REQUEST, "malformed multipart body")
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original = field
            .file_name()
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_ORIGINAL_NAME)
            .to_owned();
        let bytes = field.bytes().await.map_err(|e| {
            warn!(error = %e, "failed to read upload field");
            (StatusCode::BAD_REQUEST, "failed to read upload")
        })?;

        let stored = state.store.store(&bytes).await.map_err(|e| {
            error!(error = %e, "failed to persist upload");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to store upload")
        })?;

        info!(generated = %stored.generated, original = %original, size = stored.size, "upload stored");
        let url = state.retrieval_url(&stored.generated, &original);
        return Ok(Json(UploadReceipt { url, name: original }));
    }

    Err((StatusCode::BAD_REQUEST, "missing file field"))
}

/// `GET /uploads/{filename}`: serve a stored upload as a presentation.
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Response {
    match state.store.read(&filename).await {
        Ok(bytes) => {
            let display = query
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or(&filename);
            (
                [
                    (CONTENT_TYPE, HeaderValue::from_static(PPTX_MIME)),
                    (CONTENT_DISPOSITION, content_disposition(display)),
                ],
                bytes,
            )
                .into_response()
        }
        Err(StorageError::NotFound(_) | StorageError::InvalidName(_)) => {
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        Err(StorageError::Io(e)) => {
            error!(error = %e, %filename, "failed to read upload");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to read upload").into_response()
        }
    }
}

/// `inline; filename="<display>.pptx"`, with quoting characters and controls
/// replaced so a client-supplied name cannot break the header.
pub(crate) fn content_disposition(display: &str) -> HeaderValue {
    let safe: String = display
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    HeaderValue::from_bytes(format!("inline; filename=\"{safe}.pptx\"").as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("inline"))
}

#[cfg(test)]
#[path = "uploads_test.rs"]
mod tests;
