//! Periodic refresh with exponential backoff after failed cycles.
//!
//! A failed or partially failed cycle is retried after a backoff delay
//! (doubling each attempt, capped). Once retries are exhausted, or after a
//! successful cycle, the scheduler falls back to the regular interval.

use std::sync::Arc;
use std::time::Duration;

use dayahead_core::config::RefreshConfig;
use tokio_util::sync::CancellationToken;

use crate::orchestrator::{RefreshOrchestrator, RefreshOutcome};

/// Default retry configuration
pub const DEFAULT_INTERVAL_SECS: u64 = 30 * 60;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_SECS: u64 = 30;
pub const DEFAULT_MAX_DELAY_SECS: u64 = 600;

/// Refresh timing configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Delay between cycles when nothing failed
    pub interval: Duration,
    /// Maximum number of retry attempts after a failed cycle
    pub max_retries: u32,
    /// Initial delay between retries (doubles each attempt)
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_secs(DEFAULT_INITIAL_DELAY_SECS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
        }
    }
}

impl From<&RefreshConfig> for RefreshPolicy {
    fn from(config: &RefreshConfig) -> Self {
        Self {
            interval: Duration::from_secs(u64::from(config.interval_minutes.max(1)) * 60),
            max_retries: config.max_retries,
            initial_delay: Duration::from_secs(config.initial_backoff_secs),
            max_delay: Duration::from_secs(config.max_backoff_secs),
        }
    }
}

impl RefreshPolicy {
    /// Calculate the delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        // Exponential backoff: initial_delay * 2^attempt
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }
}

pub struct RefreshScheduler {
    orchestrator: Arc<RefreshOrchestrator>,
    policy: RefreshPolicy,
    attempt: u32,
}

impl RefreshScheduler {
    pub fn new(orchestrator: Arc<RefreshOrchestrator>, policy: RefreshPolicy) -> Self {
        Self {
            orchestrator,
            policy,
            attempt: 0,
        }
    }

    /// Delay before the next cycle given how the last one ended.
    /// `None` means stop.
    pub fn next_delay(&mut self, outcome: RefreshOutcome) -> Option<Duration> {
        match outcome {
            RefreshOutcome::Cancelled => None,
            RefreshOutcome::Success => {
                self.attempt = 0;
                Some(self.policy.interval)
            }
            RefreshOutcome::PartialFailure | RefreshOutcome::TotalFailure => {
                if self.attempt < self.policy.max_retries {
                    let delay = self.policy.delay_for_attempt(self.attempt);
                    self.attempt += 1;
                    tracing::info!(
                        "Retry attempt {} of {}, waiting {:?}",
                        self.attempt,
                        self.policy.max_retries,
                        delay
                    );
                    Some(delay)
                } else {
                    tracing::warn!(
                        "All {} retry attempts exhausted, waiting for next interval",
                        self.policy.max_retries
                    );
                    self.attempt = 0;
                    Some(self.policy.interval)
                }
            }
        }
    }

    /// Refresh now, then keep refreshing until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let report = self.orchestrator.refresh_all_until(&cancel).await;
            let Some(delay) = self.next_delay(report.outcome) else {
                break;
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => break,
            }
        }

        tracing::info!("Refresh scheduler stopped");
    }
}
