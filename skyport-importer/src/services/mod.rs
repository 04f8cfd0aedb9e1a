//! Service modules for the import pipeline
//!
//! - Selection resolution and pacing (pure policy)
//! - Retrying publisher and import orchestrator
//! - Bluesky XRPC client

pub mod bsky_client;
pub mod orchestrator;
pub mod pacing;
pub mod publisher;
pub mod selection;

#[cfg(test)]
pub mod test_support;

pub use bsky_client::{BskyClient, BskyConnector};
pub use orchestrator::ImportOrchestrator;
pub use pacing::{pace_for, PacingPolicy};
pub use publisher::{PublishOutcome, RetryPolicy, RetryingPublisher, MAX_BODY_CHARS};
pub use selection::{resolve_request, resolve_selection, MAX_SELECTION};
