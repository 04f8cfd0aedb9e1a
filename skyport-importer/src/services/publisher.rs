//! Retrying item publisher
//!
//! Publishes one candidate item as a feed post. Each item goes through an
//! explicit retry state machine:
//!
//! ```text
//! Attempting(0) --fail--> wait 1s --> Attempting(1) --fail--> wait 2s --> Attempting(2)
//!     --fail--> wait 4s --> Attempting(3) --fail--> Abandoned
//! Attempting(j) --ok--> Succeeded
//! ```
//!
//! Items whose body is too long are skipped without an attempt. A timestamp
//! that cannot be converted is fatal and returned as an error. Remote failures
//! never escape: the item is abandoned and the caller moves on.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::ImportError;
use crate::models::CandidateItem;
use crate::types::{PostRecord, RecordRef, RecordWriter, POST_COLLECTION};

/// Longest body (in characters) that is sent to the remote service
pub const MAX_BODY_CHARS: usize = 3000;

/// Characters of the body included in log lines
const LOG_SUMMARY_CHARS: usize = 50;

/// Retry tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per item, including the first
    pub max_attempts: u32,
    /// Wait after the first failed attempt; doubles after each further failure
    pub base_delay: Duration,
    /// Also wait after the last failed attempt before abandoning the item
    pub sleep_after_final_failure: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            sleep_after_final_failure: false,
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (0-indexed): `base * 2^attempt`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Per-item retry state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// About to make attempt `j` (0-indexed)
    Attempting(u32),
    Succeeded,
    Abandoned,
}

/// Result of publishing one item
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// Record created
    Published { attempts: u32, record: RecordRef },
    /// Not attempted; body exceeds `MAX_BODY_CHARS`
    Skipped { body_chars: usize },
    /// Every attempt failed
    Abandoned { attempts: u32, last_error: String },
}

/// Publishes candidate items with bounded exponential backoff
pub struct RetryingPublisher {
    writer: Arc<dyn RecordWriter>,
    policy: RetryPolicy,
}

impl RetryingPublisher {
    pub fn new(writer: Arc<dyn RecordWriter>) -> Self {
        Self::with_policy(writer, RetryPolicy::default())
    }

    pub fn with_policy(writer: Arc<dyn RecordWriter>, policy: RetryPolicy) -> Self {
        Self { writer, policy }
    }

    /// Publish one item
    ///
    /// # Errors
    /// Only `ImportError::TimestampParse`; every remote failure is absorbed
    /// into `PublishOutcome::Abandoned`.
    pub async fn publish(&self, item: &CandidateItem) -> Result<PublishOutcome, ImportError> {
        let body_chars = item.char_len();
        if body_chars > MAX_BODY_CHARS {
            warn!(
                body_chars,
                summary = %item.summary(LOG_SUMMARY_CHARS),
                "Tweet is too long to import, skipping"
            );
            return Ok(PublishOutcome::Skipped { body_chars });
        }

        let created_at = skyport_common::time::export_to_rfc3339(&item.created_at).map_err(|e| {
            ImportError::TimestampParse {
                value: item.created_at.clone(),
                reason: e.to_string(),
            }
        })?;
        let record = PostRecord::new(item.body_text.clone(), created_at);

        let max_attempts = self.policy.max_attempts.max(1);
        let mut state = AttemptState::Attempting(0);
        let mut attempts_made = 0u32;
        let mut last_error = String::new();
        let mut created: Option<RecordRef> = None;

        loop {
            match state {
                AttemptState::Attempting(attempt) => {
                    attempts_made = attempt + 1;
                    match self.writer.create_record(POST_COLLECTION, &record).await {
                        Ok(record_ref) => {
                            info!(
                                attempt = attempts_made,
                                uri = %record_ref.uri,
                                summary = %item.summary(LOG_SUMMARY_CHARS),
                                "Successfully imported tweet"
                            );
                            created = Some(record_ref);
                            state = AttemptState::Succeeded;
                        }
                        Err(e) => {
                            last_error = e.to_string();
                            let wait = self.policy.backoff_for(attempt);

                            if attempts_made >= max_attempts {
                                error!(
                                    attempt = attempts_made,
                                    error = %e,
                                    "Error importing tweet on final attempt"
                                );
                                if self.policy.sleep_after_final_failure {
                                    tokio::time::sleep(wait).await;
                                }
                                state = AttemptState::Abandoned;
                            } else {
                                error!(
                                    attempt = attempts_made,
                                    error = %e,
                                    wait_secs = wait.as_secs_f64(),
                                    "Error importing tweet, retrying after backoff"
                                );
                                tokio::time::sleep(wait).await;
                                state = AttemptState::Attempting(attempt + 1);
                            }
                        }
                    }
                }
                AttemptState::Succeeded => {
                    let record = created.take().ok_or_else(|| {
                        ImportError::Unexpected("publish succeeded without a record".to_string())
                    })?;
                    return Ok(PublishOutcome::Published {
                        attempts: attempts_made,
                        record,
                    });
                }
                AttemptState::Abandoned => {
                    error!(
                        attempts = attempts_made,
                        summary = %item.summary(LOG_SUMMARY_CHARS),
                        "Failed to import tweet after {} attempts",
                        attempts_made
                    );
                    return Ok(PublishOutcome::Abandoned {
                        attempts: attempts_made,
                        last_error,
                    });
                }
            }
        }
    }
}
