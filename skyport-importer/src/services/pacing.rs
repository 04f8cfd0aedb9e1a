//! Pacing policy
//!
//! Large batches are spread out to stay under the remote service's record
//! creation limits. The delay is applied after each successful publish only.

use std::time::Duration;

/// Batch size from which the long delay applies
pub const LARGE_BATCH: usize = 11_666;
/// Batch size from which the medium delay applies
pub const MEDIUM_BATCH: usize = 1_666;

const LARGE_BATCH_DELAY: Duration = Duration::from_millis(7500);
const MEDIUM_BATCH_DELAY: Duration = Duration::from_millis(2200);

fn delay_for(total_items: usize) -> Duration {
    if total_items >= LARGE_BATCH {
        LARGE_BATCH_DELAY
    } else if total_items >= MEDIUM_BATCH {
        MEDIUM_BATCH_DELAY
    } else {
        Duration::ZERO
    }
}

/// Inter-item delay in seconds for a batch of `total_items`
pub fn pace_for(total_items: usize) -> f64 {
    delay_for(total_items).as_secs_f64()
}

/// Delay applied after each successful publish of one job
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingPolicy {
    delay: Duration,
}

impl PacingPolicy {
    pub fn for_batch(total_items: usize) -> Self {
        Self {
            delay: delay_for(total_items),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep for the pacing delay (no-op for small batches)
    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tracing::debug!(delay_secs = self.delay.as_secs_f64(), "Pacing before next item");
            tokio::time::sleep(self.delay).await;
        }
    }
}
