//! Processing request API handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use batchpix_core::{parse_manifest, ManifestError, StatusView};

use crate::metrics::{MANIFESTS_ACCEPTED_TOTAL, MANIFESTS_REJECTED_TOTAL};
use crate::state::AppState;

/// Multipart field that carries the manifest.
const MANIFEST_FIELD: &str = "file";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for accepted uploads
#[derive(Debug, Serialize)]
pub struct CreateRequestResponse {
    pub request_id: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct RequestErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<RequestErrorResponse>) {
    (
        status,
        Json(RequestErrorResponse {
            error: message.into(),
        }),
    )
}

fn reject(reason: &str, status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<RequestErrorResponse>) {
    MANIFESTS_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    error_response(status, message)
}

// ============================================================================
// Handlers
// ============================================================================

/// Accept a manifest upload and enqueue it for background processing.
///
/// Validation is all-or-nothing: nothing is persisted unless the whole
/// manifest is valid. On success the request id is returned immediately,
/// before any processing happens.
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreateRequestResponse>), (StatusCode, Json<RequestErrorResponse>)> {
    let mut manifest: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        reject(
            "malformed_upload",
            StatusCode::BAD_REQUEST,
            format!("Malformed multipart upload: {}", e),
        )
    })? {
        if field.name() != Some(MANIFEST_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| {
                reject(
                    "malformed_upload",
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read uploaded file: {}", e),
                )
            })?
            .to_vec();
        manifest = Some((filename, bytes));
        break;
    }

    let Some((filename, bytes)) = manifest else {
        return Err(reject(
            "missing_file",
            StatusCode::BAD_REQUEST,
            format!("Missing multipart field '{}'", MANIFEST_FIELD),
        ));
    };

    if !filename.ends_with(".csv") {
        return Err(reject(
            "not_csv",
            StatusCode::BAD_REQUEST,
            "Invalid file type, please upload a CSV file",
        ));
    }

    let content = String::from_utf8(bytes).map_err(|_| {
        reject(
            "encoding",
            StatusCode::BAD_REQUEST,
            "Uploaded file is not valid UTF-8",
        )
    })?;

    let items = parse_manifest(&content).map_err(|e| {
        let reason = match &e {
            ManifestError::Schema(_) => "schema",
            ManifestError::InvalidRefs(_) => "invalid_refs",
        };
        reject(reason, StatusCode::BAD_REQUEST, e.to_string())
    })?;

    let request = state.store().create(&items).map_err(|e| {
        warn!("Failed to persist request: {}", e);
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to persist request",
        )
    })?;

    MANIFESTS_ACCEPTED_TOTAL.inc();
    info!(
        "Accepted manifest '{}' with {} items as request {}",
        filename,
        request.items.len(),
        request.id
    );

    // The response never waits for the run itself.
    if let Err(e) = state
        .orchestrator_handle()
        .enqueue(request.id.clone())
        .await
    {
        warn!("Failed to enqueue request {}: {}", request.id, e);
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Processing queue is unavailable",
        ));
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateRequestResponse {
            request_id: request.id,
        }),
    ))
}

/// Get the current status of a request.
pub async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusView>, (StatusCode, Json<RequestErrorResponse>)> {
    match state.reporter().get_status(&id) {
        Ok(Some(view)) => Ok(Json(view)),
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, "Request not found")),
        Err(e) => {
            warn!("Failed to load request {}: {}", id, e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load request",
            ))
        }
    }
}

/// Download the generated CSV artifact for a completed request.
pub async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<RequestErrorResponse>)> {
    let request = match state.store().get(&id) {
        Ok(Some(request)) => request,
        Ok(None) => return Err(error_response(StatusCode::NOT_FOUND, "Request not found")),
        Err(e) => {
            warn!("Failed to load request {}: {}", id, e);
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load request",
            ));
        }
    };

    let Some(artifact_ref) = request.artifact_ref else {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            "Artifact not available yet",
        ));
    };

    let content = tokio::fs::read_to_string(&artifact_ref).await.map_err(|e| {
        warn!("Failed to read artifact {}: {}", artifact_ref, e);
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to read artifact",
        )
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"output_{}.csv\"", id),
            ),
        ],
        content,
    ))
}
