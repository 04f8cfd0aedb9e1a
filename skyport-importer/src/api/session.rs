//! Login / logout and the session extractor
//!
//! POST /login, POST /logout. The session id travels in the
//! `skyport_session` cookie; `CurrentSession` resolves it for handlers that
//! need a logged-in user and rejects everything else with 401.

use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::session::{SessionContext, SessionId};
use crate::AppState;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "skyport_session";

/// POST /login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Handle or email used as the login identifier
    pub handle: String,
    /// Account or app password
    pub password: String,
}

/// POST /login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub handle: String,
    pub did: String,
}

/// Session id from the request's cookies, if present and well-formed
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.trim().parse().ok())
}

fn session_cookie(id: SessionId) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

fn expired_cookie() -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", SESSION_COOKIE)
}

/// Session of the logged-in user making the request
pub struct CurrentSession(pub Arc<SessionContext>);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = session_id_from_headers(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Not logged in".to_string()))?;

        state
            .sessions
            .get(id)
            .await
            .map(CurrentSession)
            .ok_or_else(|| ApiError::Unauthorized("Session expired or unknown".to_string()))
    }
}

/// POST /login
///
/// Authenticates against the PDS and opens a session with its own workspace.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let handle = request.handle.trim();
    if handle.is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Handle and password are required".to_string(),
        ));
    }

    let writer = state
        .connector
        .connect(handle, &request.password)
        .await
        .map_err(|e| {
            tracing::warn!(handle = %handle, error = %e, "Login failed");
            ApiError::Unauthorized(format!("Login failed: {}", e))
        })?;

    let context = SessionContext::new(writer, state.config.temp_root.as_deref())
        .map_err(|e| ApiError::Internal(format!("Could not create session workspace: {}", e)))?;
    let session = state.sessions.insert(context).await;

    let account = session.account().clone();
    tracing::info!(
        session_id = %session.id(),
        handle = %account.handle,
        did = %account.did,
        "User logged in"
    );

    let cookie = HeaderValue::from_str(&session_cookie(session.id()))
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            handle: account.handle,
            did: account.did,
        }),
    ))
}

/// POST /logout
///
/// Drops the session; its workspace is removed once no import holds it.
pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<impl IntoResponse> {
    state.sessions.remove(session.id()).await;
    tracing::info!(session_id = %session.id(), "User logged out");

    let cookie =
        HeaderValue::from_str(&expired_cookie()).map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "status": "logged_out" })),
    ))
}

/// Build login/logout routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_session_id_from_cookie_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}; other=1", SESSION_COOKIE, id)).unwrap(),
        );
        assert_eq!(session_id_from_headers(&headers), Some(id));
    }

    #[test]
    fn test_session_id_missing_or_malformed() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_id_from_headers(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("skyport_session=not-a-uuid"),
        );
        assert_eq!(session_id_from_headers(&headers), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let id = Uuid::new_v4();
        let cookie = session_cookie(id);
        assert!(cookie.starts_with(&format!("skyport_session={};", id)));
        assert!(cookie.contains("HttpOnly"));
        assert!(expired_cookie().contains("Max-Age=0"));
    }
}
