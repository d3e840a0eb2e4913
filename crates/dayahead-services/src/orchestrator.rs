//! Concurrent refresh of every source with partial-failure classification.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use dayahead_core::PreferencesStore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::adapters::{RefreshContext, SourceAdapter, SourceKind};

/// Aggregate result of one refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Success,
    /// Some sources failed; the ones that succeeded kept their writes.
    PartialFailure,
    TotalFailure,
    Cancelled,
}

impl RefreshOutcome {
    /// Whether the scheduler should try again soon.
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::PartialFailure | Self::TotalFailure)
    }
}

/// What happened to one source during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterOutcome {
    Refreshed,
    /// Not run because a prerequisite is missing; counts as success.
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub outcome: RefreshOutcome,
    pub sources: Vec<(SourceKind, AdapterOutcome)>,
}

impl RefreshReport {
    pub fn source(&self, kind: SourceKind) -> Option<AdapterOutcome> {
        self.sources
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, outcome)| *outcome)
    }
}

/// Classify per-source results. Skipped sources count as successes.
pub fn classify(results: &[AdapterOutcome]) -> RefreshOutcome {
    let failed = results
        .iter()
        .filter(|r| **r == AdapterOutcome::Failed)
        .count();

    if failed == 0 {
        RefreshOutcome::Success
    } else if failed == results.len() {
        RefreshOutcome::TotalFailure
    } else {
        RefreshOutcome::PartialFailure
    }
}

pub struct RefreshOrchestrator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    preferences: Arc<PreferencesStore>,
}

impl RefreshOrchestrator {
    pub fn new(preferences: Arc<PreferencesStore>, adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self {
            adapters,
            preferences,
        }
    }

    pub async fn refresh_all(&self) -> RefreshReport {
        self.refresh_all_until(&CancellationToken::new()).await
    }

    /// Run every adapter concurrently and wait for all of them, or abort
    /// the whole cycle when `cancel` fires.
    pub async fn refresh_all_until(&self, cancel: &CancellationToken) -> RefreshReport {
        let prefs = self.preferences.snapshot();
        let ctx = Arc::new(RefreshContext {
            location: prefs.location,
            unit: prefs.temperature_unit,
            now: Utc::now(),
        });

        let mut results: HashMap<SourceKind, AdapterOutcome> = HashMap::new();
        let mut pending: Vec<SourceKind> = Vec::new();
        let mut tasks = JoinSet::new();

        for adapter in &self.adapters {
            let kind = adapter.kind();
            if adapter.requires_location() && ctx.location.is_none() {
                tracing::info!("Skipping {} refresh: no location stored", kind);
                results.insert(kind, AdapterOutcome::Skipped);
                continue;
            }

            let adapter = Arc::clone(adapter);
            let ctx = Arc::clone(&ctx);
            pending.push(kind);
            tasks.spawn(async move { (kind, adapter.refresh(&ctx).await) });
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    // Cache writes are synchronous, so an aborted task never
                    // leaves a half-written collection.
                    tasks.abort_all();
                    tracing::info!("Refresh cancelled with {} sources in flight", pending.len());
                    return self.report(RefreshOutcome::Cancelled, results);
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((kind, ok))) => {
                        pending.retain(|k| *k != kind);
                        let outcome = if ok { AdapterOutcome::Refreshed } else { AdapterOutcome::Failed };
                        results.insert(kind, outcome);
                    }
                    Some(Err(e)) => {
                        tracing::error!("Source refresh task failed: {}", e);
                    }
                }
            }
        }

        // Whatever never reported back panicked.
        for kind in pending {
            results.insert(kind, AdapterOutcome::Failed);
        }

        let outcome = classify(&results.values().copied().collect::<Vec<_>>());
        match outcome {
            RefreshOutcome::Success => tracing::info!("Refresh complete"),
            _ => tracing::warn!("Refresh finished with {:?}", outcome),
        }
        self.report(outcome, results)
    }

    fn report(
        &self,
        outcome: RefreshOutcome,
        mut results: HashMap<SourceKind, AdapterOutcome>,
    ) -> RefreshReport {
        let sources = self
            .adapters
            .iter()
            .filter_map(|a| results.remove(&a.kind()).map(|r| (a.kind(), r)))
            .collect();

        RefreshReport { outcome, sources }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use async_trait::async_trait;
    use dayahead_core::Coordinates;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubAdapter {
        kind: SourceKind,
        needs_location: bool,
        result: bool,
        calls: AtomicUsize,
    }

    impl StubAdapter {
        fn new(kind: SourceKind, result: bool) -> Arc<Self> {
            Arc::new(Self {
                kind,
                needs_location: false,
                result,
                calls: AtomicUsize::new(0),
            })
        }

        fn located(kind: SourceKind, result: bool) -> Arc<Self> {
            Arc::new(Self {
                kind,
                needs_location: true,
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn requires_location(&self) -> bool {
            self.needs_location
        }

        async fn refresh(&self, _ctx: &RefreshContext) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
        }
    }

    struct PanickingAdapter;

    #[async_trait]
    impl SourceAdapter for PanickingAdapter {
        fn kind(&self) -> SourceKind {
            SourceKind::FunFact
        }

        async fn refresh(&self, _ctx: &RefreshContext) -> bool {
            panic!("adapter bug");
        }
    }

    struct SlowAdapter;

    #[async_trait]
    impl SourceAdapter for SlowAdapter {
        fn kind(&self) -> SourceKind {
            SourceKind::News
        }

        async fn refresh(&self, _ctx: &RefreshContext) -> bool {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            true
        }
    }

    fn located_prefs() -> Arc<PreferencesStore> {
        let prefs = PreferencesStore::in_memory().unwrap();
        prefs.update_location(Coordinates::new(51.5, -0.1)).unwrap();
        Arc::new(prefs)
    }

    #[test]
    fn test_classify() {
        use AdapterOutcome::*;
        assert_eq!(classify(&[Refreshed, Refreshed]), RefreshOutcome::Success);
        assert_eq!(classify(&[Refreshed, Skipped]), RefreshOutcome::Success);
        assert_eq!(classify(&[Refreshed, Failed]), RefreshOutcome::PartialFailure);
        assert_eq!(classify(&[Skipped, Failed]), RefreshOutcome::PartialFailure);
        assert_eq!(classify(&[Failed, Failed]), RefreshOutcome::TotalFailure);
        assert_eq!(classify(&[]), RefreshOutcome::Success);
    }

    #[tokio::test]
    async fn test_all_succeed() {
        let orchestrator = RefreshOrchestrator::new(
            located_prefs(),
            vec![
                StubAdapter::located(SourceKind::Weather, true),
                StubAdapter::new(SourceKind::News, true),
            ],
        );

        let report = orchestrator.refresh_all().await;
        assert_eq!(report.outcome, RefreshOutcome::Success);
        assert_eq!(report.source(SourceKind::Weather), Some(AdapterOutcome::Refreshed));
    }

    #[tokio::test]
    async fn test_one_failure_is_partial() {
        let orchestrator = RefreshOrchestrator::new(
            located_prefs(),
            vec![
                StubAdapter::located(SourceKind::Weather, true),
                StubAdapter::new(SourceKind::News, true),
                StubAdapter::located(SourceKind::Calendar, false),
                StubAdapter::new(SourceKind::FunFact, true),
            ],
        );

        let report = orchestrator.refresh_all().await;
        assert_eq!(report.outcome, RefreshOutcome::PartialFailure);
        assert!(report.outcome.should_retry());
        assert_eq!(report.source(SourceKind::Calendar), Some(AdapterOutcome::Failed));
        assert_eq!(report.source(SourceKind::News), Some(AdapterOutcome::Refreshed));
    }

    #[tokio::test]
    async fn test_all_fail_is_total() {
        let orchestrator = RefreshOrchestrator::new(
            located_prefs(),
            vec![
                StubAdapter::located(SourceKind::Weather, false),
                StubAdapter::new(SourceKind::News, false),
            ],
        );

        assert_eq!(orchestrator.refresh_all().await.outcome, RefreshOutcome::TotalFailure);
    }

    #[tokio::test]
    async fn test_no_location_skips_located_sources() {
        let weather = StubAdapter::located(SourceKind::Weather, false);
        let news = StubAdapter::new(SourceKind::News, true);
        let orchestrator = RefreshOrchestrator::new(
            Arc::new(PreferencesStore::in_memory().unwrap()),
            vec![weather.clone(), news.clone()],
        );

        let report = orchestrator.refresh_all().await;
        assert_eq!(report.outcome, RefreshOutcome::Success);
        assert_eq!(report.source(SourceKind::Weather), Some(AdapterOutcome::Skipped));
        assert_eq!(weather.calls.load(Ordering::SeqCst), 0);
        assert_eq!(news.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_counts_as_failure() {
        let news = StubAdapter::new(SourceKind::News, true);
        let orchestrator = RefreshOrchestrator::new(
            located_prefs(),
            vec![news.clone(), Arc::new(PanickingAdapter)],
        );

        let report = orchestrator.refresh_all().await;
        assert_eq!(report.outcome, RefreshOutcome::PartialFailure);
        assert_eq!(report.source(SourceKind::FunFact), Some(AdapterOutcome::Failed));
        assert_eq!(news.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_aborts_cycle() {
        let orchestrator = Arc::new(RefreshOrchestrator::new(
            located_prefs(),
            vec![StubAdapter::new(SourceKind::FunFact, true), Arc::new(SlowAdapter)],
        ));
        let cancel = CancellationToken::new();

        let run = {
            let orchestrator = Arc::clone(&orchestrator);
            let cancel = cancel.clone();
            tokio::spawn(async move { orchestrator.refresh_all_until(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let report = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.outcome, RefreshOutcome::Cancelled);
        assert_eq!(report.source(SourceKind::News), None);
    }
}
