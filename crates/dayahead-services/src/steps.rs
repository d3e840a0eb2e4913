//! Today's step count from the platform health store.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveTime, Utc};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Error, Debug)]
pub enum StepsError {
    #[error("Health store unavailable: {0}")]
    Unavailable(String),

    #[error("Step query failed: {0}")]
    QueryFailed(String),
}

/// Read access to a step counter.
#[async_trait]
pub trait StepsSource: Send + Sync {
    async fn has_permission(&self) -> bool;

    /// Total steps recorded in `[start, end]`.
    async fn steps_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<u64, StepsError>;
}

/// Source used when no health store is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHealthAccess;

#[async_trait]
impl StepsSource for NoHealthAccess {
    async fn has_permission(&self) -> bool {
        false
    }

    async fn steps_between(&self, _start: DateTime<Utc>, _end: DateTime<Utc>) -> Result<u64, StepsError> {
        Err(StepsError::Unavailable("no health store configured".into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepsReading {
    Today(u64),
    PermissionDenied,
}

impl StepsReading {
    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Today(steps) => Some(*steps),
            Self::PermissionDenied => None,
        }
    }
}

/// Local midnight of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_timezone(&Local)
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(now)
}

/// In-memory holder for the latest reading. `None` until the first read.
pub struct StepsHolder {
    tx: watch::Sender<Option<StepsReading>>,
}

impl Default for StepsHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl StepsHolder {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn get(&self) -> Option<StepsReading> {
        *self.tx.borrow()
    }

    pub fn set(&self, reading: StepsReading) {
        self.tx.send_if_modified(|current| {
            if *current == Some(reading) {
                false
            } else {
                *current = Some(reading);
                true
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StepsReading>> {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        rx
    }
}
