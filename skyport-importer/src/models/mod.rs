//! Data models for skyport-importer
//!
//! - Source dataset parsed from the uploaded export
//! - Selection handles and requests
//! - Import job state machine

pub mod dataset;
pub mod import_job;
pub mod selection;

pub use dataset::{CandidateItem, DatasetError, ItemPreview, SourceDataset};
pub use import_job::{ImportJob, JobState, StateTransition};
pub use selection::{SelectionHandle, SelectionRequest};
