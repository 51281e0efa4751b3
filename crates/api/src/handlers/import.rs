//! Handlers for spreadsheet imports: upload, status and the live progress
//! stream.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use callboard_core::import::{is_accepted_file_name, ProgressSnapshot};
use callboard_events::ProgressSubscription;
use callboard_pipeline::ImportError;
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field carrying the workbook.
const UPLOAD_FIELD: &str = "file";

const MSG_IMPORT_STARTED: &str = "Excel import started in background.";
const MSG_IMPORT_RUNNING: &str = "An import is already in progress.";

/// Body of a successful upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAccepted {
    pub success: bool,
    pub job_id: Option<String>,
    pub message: &'static str,
    pub progress: ProgressSnapshot,
}

/// Body of an upload refused because a job is in flight.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConflict {
    pub error: &'static str,
    pub in_progress: bool,
    pub progress: ProgressSnapshot,
}

fn conflict(progress: ProgressSnapshot) -> Response {
    let body = UploadConflict {
        error: MSG_IMPORT_RUNNING,
        in_progress: true,
        progress,
    };
    (StatusCode::CONFLICT, Json(body)).into_response()
}

// ── Upload ───────────────────────────────────────────────────────────

/// POST /api/v1/calls/import
///
/// Accept a single `.xlsx` / `.xls` file and start importing it in the
/// background. Returns 409 with the running job's snapshot if another import
/// holds the slot.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let current = state.jobs().snapshot();
    if current.in_progress {
        return Ok(conflict(current));
    }

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(AppError::BadRequest("No file provided.".into()));
    };
    if !is_accepted_file_name(&file_name) {
        return Err(AppError::BadRequest(
            "File must be an Excel document (.xlsx or .xls).".into(),
        ));
    }

    match state.imports.start(&file_name, bytes) {
        Ok(started) => {
            tracing::info!(
                job_id = started.snapshot.job_id.as_deref().unwrap_or_default(),
                file_name = %file_name,
                "Import started",
            );
            let body = UploadAccepted {
                success: true,
                job_id: started.snapshot.job_id.clone(),
                message: MSG_IMPORT_STARTED,
                progress: started.snapshot,
            };
            Ok((StatusCode::OK, Json(body)).into_response())
        }
        // Lost the race with another upload between the check and admission.
        Err(ImportError::AlreadyRunning(current)) => Ok(conflict(*current)),
        Err(e) => Err(e.into()),
    }
}

// ── Status ───────────────────────────────────────────────────────────

/// GET /api/v1/calls/import
///
/// Current (or last) import snapshot, unwrapped.
pub async fn status(State(state): State<AppState>) -> Json<ProgressSnapshot> {
    Json(state.jobs().snapshot())
}

// ── Stream ───────────────────────────────────────────────────────────

/// GET /api/v1/calls/import/stream
///
/// Server-sent events: the current snapshot on connect, then one event per
/// progress change until the client disconnects or the server shuts down.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    // Subscribe before reading the snapshot so no change is missed.
    let subscription = state.progress_hub.subscribe();
    let initial = state.jobs().snapshot();
    tracing::debug!(subscriber_id = subscription.id(), "Progress stream opened");

    let updates = stream::unfold(subscription, |mut sub: ProgressSubscription| async move {
        sub.recv().await.map(|snapshot| (snapshot, sub))
    });

    let events = stream::once(async move { initial })
        .chain(updates)
        .map(|snapshot| Event::default().json_data(&snapshot));

    Sse::new(events).keep_alive(KeepAlive::default())
}
