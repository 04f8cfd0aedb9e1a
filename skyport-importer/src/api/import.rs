//! Import API handlers
//!
//! POST /import/start resolves and persists a selection; GET /import/events
//! runs the import for a handle and streams its progress.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::api::CurrentSession;
use crate::config::MODULE_NAME;
use crate::error::{ApiError, ApiResult, ImportError};
use crate::models::{SelectionHandle, SelectionRequest};
use crate::services::{resolve_request, ImportOrchestrator};
use crate::AppState;

/// POST /import/start response
#[derive(Debug, Serialize, Deserialize)]
pub struct StartImportResponse {
    pub selection: SelectionHandle,
}

/// GET /import/events query
#[derive(Debug, Deserialize)]
pub struct ImportEventsQuery {
    pub selection: Option<String>,
}

/// POST /import/start
///
/// Validates the selection against the uploaded dataset and returns a handle
/// for `GET /import/events`.
pub async fn start_import(
    CurrentSession(session): CurrentSession,
    Json(request): Json<SelectionRequest>,
) -> ApiResult<Json<StartImportResponse>> {
    if request.tweet_indices.is_empty() && !request.inversion {
        return Err(ImportError::EmptySelection.into());
    }

    let dataset = session.dataset().await.ok_or(ImportError::DatasetMissing)?;
    let positions = resolve_request(dataset.len(), &request)?;
    let selection = session.persist_selection(&positions).await?;

    tracing::info!(
        session_id = %session.id(),
        selection = %selection,
        count = positions.len(),
        inversion = request.inversion,
        "Import selection accepted"
    );

    Ok(Json(StartImportResponse { selection }))
}

/// GET /import/events?selection=<handle>
///
/// Spawns the import as a producer task and streams its frames. The job keeps
/// running if the client goes away.
pub async fn import_events(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<ImportEventsQuery>,
) -> ApiResult<impl IntoResponse> {
    let raw = query
        .selection
        .ok_or_else(|| ApiError::BadRequest("Missing selection parameter".to_string()))?;
    let handle: SelectionHandle = raw
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid selection handle: {}", raw)))?;

    if !session.is_issued(handle).await {
        return Err(ApiError::BadRequest(format!("Unknown selection: {}", handle)));
    }

    let guard = session.try_begin_import().ok_or_else(|| {
        ApiError::Conflict("An import is already running in this session".to_string())
    })?;

    let (tx, rx) = mpsc::channel(state.config.event_buffer);
    let orchestrator = ImportOrchestrator::new(tx);
    let job_session = session.clone();
    // The handle was issued against this dataset; a later upload revokes it
    let dataset = session.dataset().await;

    tokio::spawn(async move {
        let _guard = guard;
        let cleanup_session = job_session.clone();
        orchestrator
            .run(&job_session, handle, move || async move {
                cleanup_session
                    .release_import_artifacts(handle, dataset.as_ref())
                    .await;
            })
            .await;
    });

    Ok(skyport_common::sse::progress_sse_stream(MODULE_NAME, rx))
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import/start", post(start_import))
        .route("/import/events", get(import_events))
}
