//! Export upload and preview
//!
//! POST /upload, GET /tweets

use axum::{
    extract::Multipart,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::CurrentSession;
use crate::error::{ApiError, ApiResult};
use crate::models::ItemPreview;
use crate::AppState;

/// Multipart field holding the export file
const FILE_FIELD: &str = "file";
const EXPORT_EXTENSION: &str = ".js";

/// POST /upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    /// Tweets found in the export
    pub count: usize,
}

/// GET /tweets response
#[derive(Debug, Serialize)]
pub struct TweetsResponse {
    pub count: usize,
    pub tweets: Vec<ItemPreview>,
}

/// POST /upload
///
/// Stores the export in the session workspace and parses it. A new upload
/// replaces the previous one.
pub async fn upload(
    CurrentSession(session): CurrentSession,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ApiError::BadRequest("No selected file".to_string()));
        }
        if !filename.ends_with(EXPORT_EXTENSION) {
            return Err(ApiError::BadRequest(format!(
                "Expected a {} export file, got {}",
                EXPORT_EXTENSION, filename
            )));
        }

        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Could not read upload: {}", e)))?;
        if content.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
        }

        let count = session.store_dataset(&filename, &content).await?;
        return Ok(Json(UploadResponse { filename, count }));
    }

    Err(ApiError::BadRequest("No file part".to_string()))
}

/// GET /tweets
pub async fn list_tweets(CurrentSession(session): CurrentSession) -> ApiResult<Json<TweetsResponse>> {
    let dataset = session
        .dataset()
        .await
        .ok_or_else(|| ApiError::NotFound("No tweets uploaded".to_string()))?;

    Ok(Json(TweetsResponse {
        count: dataset.len(),
        tweets: dataset.previews(),
    }))
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .route("/tweets", get(list_tweets))
}
