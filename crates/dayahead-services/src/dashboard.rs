//! Entry point that wires the stores, adapters, orchestrator and aggregator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Duration;
use dayahead_calendar::{CalendarCache, CalendarClient, EventSource, NoCalendarAccess};
use dayahead_core::{
    database_error, AppError, Config, ConfigError, Coordinates, PreferencesStore, ReqwestErrorExt,
};
use dayahead_news::{ArticleCache, NewsClient};
use dayahead_weather::{LocationResolver, NominatimResolver, WeatherCache, WeatherProvider};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::adapters::{
    CalendarAdapter, FunFactAdapter, NewsAdapter, SourceAdapter, StepsAdapter, WeatherAdapter,
};
use crate::aggregator::{Aggregator, AggregatorHandle, AggregatorInputs, ViewState};
use crate::funfact::{FunFactClient, FunFactHolder};
use crate::orchestrator::{RefreshOrchestrator, RefreshReport};
use crate::scheduler::{RefreshPolicy, RefreshScheduler};
use crate::steps::{NoHealthAccess, StepsHolder};
use crate::widget::{
    read_widget_snapshot, WidgetSnapshot, CALENDAR_CACHE_FILE, NEWS_CACHE_FILE, PREFERENCES_FILE,
    WEATHER_CACHE_FILE,
};

/// Every store the dashboard reads from.
#[derive(Clone)]
pub struct Stores {
    pub preferences: Arc<PreferencesStore>,
    pub weather: Arc<WeatherCache>,
    pub articles: Arc<ArticleCache>,
    pub calendar: Arc<CalendarCache>,
    pub fun_fact: Arc<FunFactHolder>,
    pub steps: Arc<StepsHolder>,
}

impl Stores {
    /// Open the SQLite stores under `data_dir`, creating it if needed.
    pub fn open(data_dir: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(data_dir)?;

        Ok(Self {
            preferences: Arc::new(
                PreferencesStore::new(data_dir.join(PREFERENCES_FILE)).map_err(database_error)?,
            ),
            weather: Arc::new(WeatherCache::new(data_dir.join(WEATHER_CACHE_FILE)).map_err(database_error)?),
            articles: Arc::new(ArticleCache::new(data_dir.join(NEWS_CACHE_FILE)).map_err(database_error)?),
            calendar: Arc::new(
                CalendarCache::new(data_dir.join(CALENDAR_CACHE_FILE)).map_err(database_error)?,
            ),
            fun_fact: Arc::new(FunFactHolder::new()),
            steps: Arc::new(StepsHolder::new()),
        })
    }

    pub fn in_memory() -> Result<Self, AppError> {
        Ok(Self {
            preferences: Arc::new(PreferencesStore::in_memory().map_err(database_error)?),
            weather: Arc::new(WeatherCache::in_memory().map_err(database_error)?),
            articles: Arc::new(ArticleCache::in_memory().map_err(database_error)?),
            calendar: Arc::new(CalendarCache::in_memory().map_err(database_error)?),
            fun_fact: Arc::new(FunFactHolder::new()),
            steps: Arc::new(StepsHolder::new()),
        })
    }
}

/// Map a client construction failure, keeping transport details when the
/// root cause is an HTTP client error.
fn startup_error(err: impl Into<anyhow::Error>) -> AppError {
    let err = err.into();
    match err.chain().find_map(|cause| cause.downcast_ref::<reqwest::Error>()) {
        Some(http) => AppError::Network(http.to_network_error()),
        None => AppError::Other(err),
    }
}

/// Build the source adapters from configuration. No health store is
/// reachable from here, so step counts report permission denied.
pub fn adapters_from_config(
    config: &Config,
    stores: &Stores,
) -> Result<Vec<Arc<dyn SourceAdapter>>, AppError> {
    let provider = WeatherProvider::with_base_url(&config.weather.base_url).map_err(startup_error)?;
    let news = NewsClient::with_base_url(&config.news.base_url).map_err(startup_error)?;
    let fun_fact = FunFactClient::with_base_url(&config.fun_fact.base_url, &config.fun_fact.language)
        .map_err(startup_error)?;

    let events: Arc<dyn EventSource> = match std::env::var(&config.calendar.access_token_env) {
        Ok(token) if !token.trim().is_empty() => Arc::new(
            CalendarClient::new(token.trim(), &config.calendar.calendar_id).map_err(startup_error)?,
        ),
        _ => {
            tracing::info!(
                "{} not set, calendar access is not granted",
                config.calendar.access_token_env
            );
            Arc::new(NoCalendarAccess)
        }
    };

    Ok(vec![
        Arc::new(WeatherAdapter::new(provider, Arc::clone(&stores.weather))),
        Arc::new(NewsAdapter::new(news, Arc::clone(&stores.articles))),
        Arc::new(CalendarAdapter::new(
            events,
            Arc::clone(&stores.calendar),
            Duration::hours(config.calendar.window_hours),
            config.calendar.max_events,
        )),
        Arc::new(FunFactAdapter::new(fun_fact, Arc::clone(&stores.fun_fact))),
        Arc::new(StepsAdapter::new(Arc::new(NoHealthAccess), Arc::clone(&stores.steps))),
    ])
}

pub struct Dashboard {
    stores: Stores,
    orchestrator: Arc<RefreshOrchestrator>,
    resolver: Arc<dyn LocationResolver>,
    location_name: watch::Sender<Option<String>>,
    aggregator: AggregatorHandle,
    cancel: CancellationToken,
    data_dir: Option<PathBuf>,
}

impl Dashboard {
    /// Open the dashboard described by `config`. Must be called from within
    /// a tokio runtime.
    pub fn open(config: &Config) -> Result<Self, AppError> {
        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        let stores = Stores::open(&config.data_dir)?;
        let adapters = adapters_from_config(config, &stores)?;
        let resolver = NominatimResolver::with_base_url(&config.geocoding.reverse_url)
            .map_err(startup_error)?;

        let mut dashboard = Self::new(stores, adapters, Arc::new(resolver), &config.news.category);
        dashboard.data_dir = Some(config.data_dir.clone());
        Ok(dashboard)
    }

    /// Assemble a dashboard from prepared parts and start the aggregator.
    pub fn new(
        stores: Stores,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        resolver: Arc<dyn LocationResolver>,
        category: &str,
    ) -> Self {
        let orchestrator = Arc::new(RefreshOrchestrator::new(
            Arc::clone(&stores.preferences),
            adapters,
        ));
        let (location_name, _) = watch::channel(None);
        let cancel = CancellationToken::new();

        let inputs = AggregatorInputs {
            weather: stores.weather.subscribe(),
            articles: stores.articles.subscribe(),
            calendar: stores.calendar.subscribe(),
            fun_fact: stores.fun_fact.subscribe(),
            steps: stores.steps.subscribe(),
            location_name: {
                let mut rx = location_name.subscribe();
                rx.mark_changed();
                rx
            },
            preferences: stores.preferences.subscribe(),
        };
        let aggregator = Aggregator::new(inputs, Arc::clone(&stores.preferences), category)
            .spawn(cancel.child_token());

        Self {
            stores,
            orchestrator,
            resolver,
            location_name,
            aggregator,
            cancel,
            data_dir: None,
        }
    }

    pub fn preferences(&self) -> &Arc<PreferencesStore> {
        &self.stores.preferences
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Refresh every source. Resolves the location name first if a location
    /// is stored but has not been named yet.
    pub async fn refresh_all(&self) -> RefreshReport {
        if self.location_name.borrow().is_none() {
            if let Some(location) = self.stores.preferences.location() {
                self.resolve_location_name(location).await;
            }
        }
        self.orchestrator.refresh_all_until(&self.cancel).await
    }

    /// Store a new location, name it, then refresh everything.
    pub async fn update_location(&self, latitude: f64, longitude: f64) -> Result<RefreshReport, AppError> {
        let location = Coordinates::new(latitude, longitude);
        self.stores.preferences.update_location(location)?;
        tracing::info!("Location updated to {:.4}, {:.4}", latitude, longitude);

        self.resolve_location_name(location).await;
        Ok(self.orchestrator.refresh_all_until(&self.cancel).await)
    }

    /// Failures keep whatever name was resolved before.
    async fn resolve_location_name(&self, location: Coordinates) {
        match self.resolver.resolve(location).await {
            Ok(name) => {
                self.location_name.send_replace(Some(name));
            }
            Err(e) => tracing::warn!("Could not resolve location name: {}", e),
        }
    }

    /// Subscribe to the combined view state; the current state is delivered
    /// first.
    pub fn view_state(&self) -> watch::Receiver<ViewState> {
        self.aggregator.subscribe()
    }

    pub fn current_view(&self) -> ViewState {
        self.aggregator.current()
    }

    /// Widget contents as an out-of-process reader would see them.
    pub fn read_widget_snapshot(&self) -> WidgetSnapshot {
        match &self.data_dir {
            Some(dir) => read_widget_snapshot(dir),
            None => WidgetSnapshot::from_parts(
                self.stores.weather.get().as_ref(),
                self.stores.preferences.summary(),
            ),
        }
    }

    /// Periodic refresher sharing this dashboard's orchestrator.
    pub fn scheduler(&self, policy: RefreshPolicy) -> RefreshScheduler {
        RefreshScheduler::new(Arc::clone(&self.orchestrator), policy)
    }

    /// Token cancelled on shutdown; pass it to a spawned scheduler.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel in-flight refreshes and stop the aggregator.
    pub async fn shutdown(self) {
        tracing::info!("Dashboard shutdown initiated");
        self.cancel.cancel();
        self.aggregator.join().await;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use async_trait::async_trait;
    use dayahead_weather::LocationError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedResolver {
        name: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LocationResolver for FixedResolver {
        async fn resolve(&self, _coordinates: Coordinates) -> Result<String, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.name
                .map(str::to_string)
                .ok_or(LocationError::ServiceUnavailable)
        }
    }

    fn resolver(name: Option<&'static str>) -> Arc<FixedResolver> {
        Arc::new(FixedResolver {
            name,
            calls: AtomicUsize::new(0),
        })
    }

    async fn wait_for(
        rx: &mut watch::Receiver<ViewState>,
        pred: impl Fn(&ViewState) -> bool,
    ) -> ViewState {
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                {
                    let state = rx.borrow_and_update();
                    if pred(&state) {
                        return state.clone();
                    }
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_update_location_names_and_stores() {
        let resolver = resolver(Some("Islington, London"));
        let dashboard = Dashboard::new(Stores::in_memory().unwrap(), Vec::new(), resolver.clone(), "US");

        dashboard.update_location(51.548, -0.103).await.unwrap();

        assert_eq!(
            dashboard.preferences().location(),
            Some(Coordinates::new(51.548, -0.103))
        );
        let mut rx = dashboard.view_state();
        let state = wait_for(&mut rx, |s| s.location_name.is_some()).await;
        assert_eq!(state.location_name.as_deref(), Some("Islington, London"));

        // Named already, so a plain refresh does not resolve again
        dashboard.refresh_all().await;
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);

        dashboard.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_location_is_rejected() {
        let dashboard = Dashboard::new(Stores::in_memory().unwrap(), Vec::new(), resolver(None), "US");
        assert!(dashboard.update_location(120.0, 0.0).await.is_err());
        assert!(dashboard.preferences().location().is_none());
        dashboard.shutdown().await;
    }

    #[tokio::test]
    async fn test_unresolvable_location_keeps_name_empty() {
        let dashboard = Dashboard::new(Stores::in_memory().unwrap(), Vec::new(), resolver(None), "US");
        dashboard.update_location(10.0, 10.0).await.unwrap();
        assert!(dashboard.current_view().location_name.is_none());
        dashboard.shutdown().await;
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        config.calendar.max_events = 9;

        let err = Dashboard::open(&config).err().unwrap();
        assert!(matches!(err, AppError::Config(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_open_creates_cache_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().join("data"),
            ..Config::default()
        };

        let dashboard = Dashboard::open(&config).unwrap();
        assert!(config.data_dir.join(PREFERENCES_FILE).exists());
        assert!(config.data_dir.join(WEATHER_CACHE_FILE).exists());

        let widget = dashboard.read_widget_snapshot();
        assert!(widget.weather.is_none());
        assert!(!widget.has_summary());
        dashboard.shutdown().await;
    }

    #[tokio::test]
    async fn test_configured_adapters_report_steps_denied() {
        let config = Config::default();
        let stores = Stores::in_memory().unwrap();
        let adapters = adapters_from_config(&config, &stores).unwrap();
        let steps = adapters
            .iter()
            .find(|a| a.kind() == crate::adapters::SourceKind::Steps)
            .unwrap();

        let ctx = crate::adapters::RefreshContext {
            location: None,
            unit: dayahead_core::TemperatureUnit::Celsius,
            now: chrono::Utc::now(),
        };
        assert!(steps.refresh(&ctx).await);
        assert_eq!(stores.steps.get(), Some(crate::steps::StepsReading::PermissionDenied));
    }
}
