//! Bluesky XRPC client
//!
//! Minimal client for a Personal Data Server: log in, verify the profile,
//! create feed post records. Access tokens expire; when a write is rejected
//! with `ExpiredToken` the session is refreshed and the write reported as a
//! failure so the publisher's next attempt uses the new token.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::types::{AccountConnector, PostRecord, RecordRef, RecordWriter, RemoteAccount, RemoteError};

const USER_AGENT: &str = concat!("skyport-importer/", env!("CARGO_PKG_VERSION"));
const EXPIRED_TOKEN: &str = "ExpiredToken";

/// Session tokens returned by `createSession` / `refreshSession`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionTokens {
    access_jwt: String,
    refresh_jwt: String,
    handle: String,
    did: String,
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    record: &'a PostRecord,
}

/// XRPC error body
#[derive(Debug, Default, Deserialize)]
struct XrpcErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

/// Build an XRPC endpoint URL
fn xrpc_url(pds_host: &str, method: &str) -> String {
    format!("{}/xrpc/{}", pds_host.trim_end_matches('/'), method)
}

/// Map a non-success response body onto `RemoteError::Api`
fn api_error(status: u16, body: &str) -> RemoteError {
    let parsed: XrpcErrorBody = serde_json::from_str(body).unwrap_or_default();
    RemoteError::Api {
        status,
        error: if parsed.error.is_empty() {
            "Unknown".to_string()
        } else {
            parsed.error
        },
        message: if parsed.message.is_empty() {
            body.to_string()
        } else {
            parsed.message
        },
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, RemoteError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| RemoteError::Network(e.to_string()))
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
    response
        .json()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

/// Logs users in against one PDS
#[derive(Debug, Clone)]
pub struct BskyConnector {
    pds_host: String,
    timeout: Duration,
}

impl BskyConnector {
    pub fn new(pds_host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            pds_host: pds_host.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl AccountConnector for BskyConnector {
    async fn connect(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Arc<dyn RecordWriter>, RemoteError> {
        let client = BskyClient::login(&self.pds_host, self.timeout, identifier, password).await?;
        client.verify_profile().await?;
        Ok(Arc::new(client))
    }
}

/// Authenticated client bound to one repository
pub struct BskyClient {
    http_client: reqwest::Client,
    pds_host: String,
    account: RemoteAccount,
    tokens: RwLock<SessionTokens>,
}

impl BskyClient {
    /// `com.atproto.server.createSession`
    pub async fn login(
        pds_host: &str,
        timeout: Duration,
        identifier: &str,
        password: &str,
    ) -> Result<Self, RemoteError> {
        let http_client = http_client(timeout)?;
        let url = xrpc_url(pds_host, "com.atproto.server.createSession");

        tracing::debug!(url = %url, identifier = %identifier, "Creating PDS session");

        let response = http_client
            .post(&url)
            .json(&CreateSessionRequest {
                identifier,
                password,
            })
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let tokens: SessionTokens = decode(check(response).await?).await?;

        tracing::info!(handle = %tokens.handle, did = %tokens.did, "Logged in to PDS");

        Ok(Self {
            http_client,
            pds_host: pds_host.to_string(),
            account: RemoteAccount {
                did: tokens.did.clone(),
                handle: tokens.handle.clone(),
            },
            tokens: RwLock::new(tokens),
        })
    }

    /// `app.bsky.actor.getProfile` for the logged-in handle
    pub async fn verify_profile(&self) -> Result<(), RemoteError> {
        let url = xrpc_url(&self.pds_host, "app.bsky.actor.getProfile");
        let access = self.tokens.read().await.access_jwt.clone();

        let response = self
            .http_client
            .get(&url)
            .query(&[("actor", self.account.handle.as_str())])
            .bearer_auth(access)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        check(response).await?;

        tracing::debug!(handle = %self.account.handle, "Profile verified");
        Ok(())
    }

    /// `com.atproto.server.refreshSession`
    async fn refresh_session(&self) -> Result<(), RemoteError> {
        let url = xrpc_url(&self.pds_host, "com.atproto.server.refreshSession");
        let mut tokens = self.tokens.write().await;

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&tokens.refresh_jwt)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        *tokens = decode(check(response).await?).await?;

        tracing::info!(handle = %self.account.handle, "Refreshed PDS session");
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordWriter for BskyClient {
    fn account(&self) -> &RemoteAccount {
        &self.account
    }

    async fn create_record(
        &self,
        collection: &str,
        record: &PostRecord,
    ) -> Result<RecordRef, RemoteError> {
        let url = xrpc_url(&self.pds_host, "com.atproto.repo.createRecord");
        let access = self.tokens.read().await.access_jwt.clone();

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access)
            .json(&CreateRecordRequest {
                repo: &self.account.did,
                collection,
                record,
            })
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        match check(response).await {
            Ok(response) => decode(response).await,
            Err(RemoteError::Api { status, error, message }) if error == EXPIRED_TOKEN => {
                if let Err(e) = self.refresh_session().await {
                    tracing::warn!(error = %e, "Session refresh failed");
                }
                Err(RemoteError::Api {
                    status,
                    error,
                    message,
                })
            }
            Err(e) => Err(e),
        }
    }
}
