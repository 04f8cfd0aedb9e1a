//! Import orchestrator
//!
//! Drives one import job through its state machine and is the single producer
//! of the job's progress stream:
//!
//! ```text
//! IDLE -> VALIDATING -> PUBLISHING -> DRAINING -> TERMINATED
//!              |                                      ^
//!              +------------- (error frame) ----------+
//! ```
//!
//! Per item, a progress frame is emitted before the publish attempt. Pacing
//! applies after successful publishes only. The stream always ends with
//! exactly one terminal frame, after which the cleanup hook runs exactly once.

use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use skyport_common::ProgressEvent;

use crate::error::ImportError;
use crate::models::{CandidateItem, ImportJob, JobState, SelectionHandle};
use crate::services::pacing::PacingPolicy;
use crate::services::publisher::{PublishOutcome, RetryPolicy, RetryingPublisher};
use crate::session::SessionContext;

/// Runs a single import job and reports it on a progress channel
pub struct ImportOrchestrator {
    events: mpsc::Sender<ProgressEvent>,
    retry: RetryPolicy,
}

impl ImportOrchestrator {
    pub fn new(events: mpsc::Sender<ProgressEvent>) -> Self {
        Self {
            events,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run the import for `handle` to completion
    ///
    /// `cleanup` is awaited exactly once, after the terminal frame, on every
    /// path. A client that stops listening does not stop the job.
    pub async fn run<C, F>(
        self,
        session: &SessionContext,
        handle: SelectionHandle,
        cleanup: C,
    ) -> ImportJob
    where
        C: FnOnce() -> F,
        F: Future<Output = ()>,
    {
        let mut job = ImportJob::new(handle);
        info!(
            job_id = %job.job_id,
            session_id = %session.id(),
            selection = %handle,
            "Import job started"
        );

        job.transition_to(JobState::Validating);
        let terminal = match self.validate(session, handle).await {
            Err(e) => {
                warn!(job_id = %job.job_id, error = %e, "Import validation failed");
                ProgressEvent::error(e.to_string())
            }
            Ok(items) => {
                job.total = items.len();
                job.transition_to(JobState::Publishing);

                let publisher = RetryingPublisher::with_policy(session.writer(), self.retry);
                let pacing = PacingPolicy::for_batch(job.total);
                debug!(
                    job_id = %job.job_id,
                    total = job.total,
                    delay_secs = pacing.delay().as_secs_f64(),
                    "Publishing selection"
                );

                let result = self.publish_all(&mut job, &publisher, pacing, &items).await;
                job.transition_to(JobState::Draining);

                match result {
                    Ok(()) => ProgressEvent::final_summary(job.successful, job.total),
                    Err(e) => {
                        error!(job_id = %job.job_id, error = %e, "An unexpected error occurred during import");
                        ProgressEvent::error(e.to_string())
                    }
                }
            }
        };

        self.emit(terminal).await;
        cleanup().await;
        job.transition_to(JobState::Terminated);

        info!(
            job_id = %job.job_id,
            total = job.total,
            successful = job.successful,
            skipped = job.skipped,
            abandoned = job.abandoned,
            attempts = job.attempts,
            elapsed_secs = job.elapsed_seconds(),
            "Import job finished"
        );

        job
    }

    async fn validate(
        &self,
        session: &SessionContext,
        handle: SelectionHandle,
    ) -> Result<Vec<CandidateItem>, ImportError> {
        let positions = session.load_selection(handle).await?;
        let dataset = session.dataset().await.ok_or(ImportError::DatasetMissing)?;
        let items = dataset.select(&positions)?;

        if items.is_empty() {
            return Err(ImportError::EmptySelection);
        }
        Ok(items)
    }

    async fn publish_all(
        &self,
        job: &mut ImportJob,
        publisher: &RetryingPublisher,
        pacing: PacingPolicy,
        items: &[CandidateItem],
    ) -> Result<(), ImportError> {
        for (index, item) in items.iter().enumerate() {
            self.emit(ProgressEvent::progress(
                index + 1,
                job.total,
                job.last_success.clone(),
                item.body_text.clone(),
            ))
            .await;

            match publisher.publish(item).await? {
                PublishOutcome::Published { attempts, .. } => {
                    job.record_success(&item.body_text, attempts);
                    pacing.pause().await;
                }
                PublishOutcome::Skipped { .. } => job.record_skip(),
                PublishOutcome::Abandoned { attempts, .. } => job.record_abandoned(attempts),
            }
        }
        Ok(())
    }

    async fn emit(&self, event: ProgressEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Progress stream closed by client, continuing import");
        }
    }
}
