//! Import progress event types
//!
//! One `ProgressEvent` is one frame of the live import status stream. The JSON
//! shapes are what the browser client consumes:
//!
//! - progress: `{"current": 1, "total": 3, "last_success": "", "next_tweet": "..."}`
//! - final summary: `{"final": true, "successful": 3, "total": 3}`
//! - error: `{"error": "message"}`
//!
//! A stream carries any number of `Progress` frames followed by exactly one
//! terminal frame (`FinalSummary` or `Error`).

use serde::{Deserialize, Serialize};

/// One frame of the import progress stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressEvent {
    /// Emitted before each item is attempted
    Progress {
        /// 1-based index of the item about to be attempted
        current: usize,
        /// Number of items in the job
        total: usize,
        /// Text of the most recent successful item ("" if none yet)
        last_success: String,
        /// Text of the item about to be attempted
        next_tweet: String,
    },

    /// Normal completion
    FinalSummary {
        /// Always `true`; lets the client tell this frame apart
        #[serde(rename = "final")]
        is_final: bool,
        /// Items created on the remote service
        successful: usize,
        /// Items in the job (including skipped and abandoned ones)
        total: usize,
    },

    /// Abnormal completion
    Error {
        /// Human-readable failure description
        error: String,
    },
}

impl ProgressEvent {
    /// Per-item progress frame
    pub fn progress(
        current: usize,
        total: usize,
        last_success: impl Into<String>,
        next_tweet: impl Into<String>,
    ) -> Self {
        ProgressEvent::Progress {
            current,
            total,
            last_success: last_success.into(),
            next_tweet: next_tweet.into(),
        }
    }

    /// Terminal summary frame
    pub fn final_summary(successful: usize, total: usize) -> Self {
        ProgressEvent::FinalSummary {
            is_final: true,
            successful,
            total,
        }
    }

    /// Terminal error frame
    pub fn error(message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            error: message.into(),
        }
    }

    /// Whether this frame ends the stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Progress { .. })
    }

    /// Event kind for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::Progress { .. } => "progress",
            ProgressEvent::FinalSummary { .. } => "final",
            ProgressEvent::Error { .. } => "error",
        }
    }
}
