//! Import job state machine
//!
//! An import job progresses through five states:
//! IDLE → VALIDATING → PUBLISHING → DRAINING → TERMINATED
//!
//! A validation failure jumps straight from VALIDATING to TERMINATED.
//! Only the orchestrator mutates a job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::SelectionHandle;

/// Import job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    /// Created, not started
    Idle,
    /// Loading selection artifact and dataset
    Validating,
    /// Publishing items one at a time
    Publishing,
    /// Loop finished; terminal event pending
    Draining,
    /// Terminal event sent and artifacts released
    Terminated,
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub job_id: Uuid,
    pub old_state: JobState,
    pub new_state: JobState,
    pub transitioned_at: DateTime<Utc>,
}

/// Run-scoped import state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    /// Unique job identifier
    pub job_id: Uuid,

    /// Selection this job imports
    pub selection: SelectionHandle,

    /// Current state
    pub state: JobState,

    /// Items in the job
    pub total: usize,

    /// Remote write attempts across all items
    pub attempts: u32,

    /// Items created on the remote service
    pub successful: usize,

    /// Items skipped without an attempt (body too long)
    pub skipped: usize,

    /// Items abandoned after exhausting retries
    pub abandoned: usize,

    /// Body of the last successfully created item ("" if none)
    pub last_success: String,

    /// Job start time
    pub started_at: DateTime<Utc>,

    /// Job end time (set on TERMINATED)
    pub ended_at: Option<DateTime<Utc>>,

    /// Every state change, oldest first
    pub history: Vec<StateTransition>,
}

impl ImportJob {
    pub fn new(selection: SelectionHandle) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            selection,
            state: JobState::Idle,
            total: 0,
            attempts: 0,
            successful: 0,
            skipped: 0,
            abandoned: 0,
            last_success: String::new(),
            started_at: Utc::now(),
            ended_at: None,
            history: Vec::new(),
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: JobState) {
        let transition = StateTransition {
            job_id: self.job_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state == JobState::Terminated {
            self.ended_at = Some(transition.transitioned_at);
        }

        tracing::debug!(
            job_id = %self.job_id,
            from = ?transition.old_state,
            to = ?transition.new_state,
            "Import job state transition"
        );

        self.history.push(transition);
    }

    /// States visited so far, starting with IDLE
    pub fn states(&self) -> Vec<JobState> {
        std::iter::once(JobState::Idle)
            .chain(self.history.iter().map(|t| t.new_state))
            .collect()
    }

    pub fn record_success(&mut self, body_text: &str, attempts: u32) {
        self.attempts += attempts;
        self.successful += 1;
        self.last_success = body_text.to_string();
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_abandoned(&mut self, attempts: u32) {
        self.attempts += attempts;
        self.abandoned += 1;
    }

    pub fn is_terminal(&self) -> bool {
        self.state == JobState::Terminated
    }

    /// Seconds since the job started (until it ended, if it has)
    pub fn elapsed_seconds(&self) -> u64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_seconds().max(0) as u64
    }
}
