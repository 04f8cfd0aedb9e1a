//! # Skyport Common Library
//!
//! Shared code for the Skyport services including:
//! - Error type and result alias
//! - Configuration loading (TOML file discovery, tiered resolution)
//! - Import progress event types
//! - Server-Sent Events encoding of the progress stream
//! - Export timestamp conversion

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use events::ProgressEvent;
