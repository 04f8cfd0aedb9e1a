//! Remote service types and trait seams
//!
//! The import pipeline only talks to the remote network through two traits:
//! - `AccountConnector` authenticates a user and hands back a writer
//! - `RecordWriter` creates one record per call
//!
//! `services::bsky_client` implements both against a real PDS; tests plug in
//! scripted fakes.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Collection that holds feed posts
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// Record payload for one feed post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(rename = "$type")]
    pub record_type: String,
    pub text: String,
    /// RFC 3339 timestamp
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl PostRecord {
    pub fn new(text: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            record_type: POST_COLLECTION.to_string(),
            text: text.into(),
            created_at: created_at.into(),
        }
    }
}

/// Reference to a created record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub uri: String,
    pub cid: String,
}

/// Authenticated account identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAccount {
    /// Repository identifier (e.g., "did:plc:...")
    pub did: String,
    /// Account handle (e.g., "alice.bsky.social")
    pub handle: String,
}

/// Remote service errors
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status} {error}: {message}")]
    Api {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Decode error: {0}")]
    Decode(String),
}

/// Creates records in one authenticated repository
#[async_trait::async_trait]
pub trait RecordWriter: Send + Sync {
    /// Account the records are written to
    fn account(&self) -> &RemoteAccount;

    /// Create a single record
    ///
    /// # Errors
    /// Any failure is treated as transient by the caller and retried.
    async fn create_record(
        &self,
        collection: &str,
        record: &PostRecord,
    ) -> Result<RecordRef, RemoteError>;
}

/// Authenticates users against the remote service
#[async_trait::async_trait]
pub trait AccountConnector: Send + Sync {
    /// Log in and return a writer bound to the user's repository
    async fn connect(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Arc<dyn RecordWriter>, RemoteError>;
}
