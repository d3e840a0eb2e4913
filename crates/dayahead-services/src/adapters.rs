//! Source adapters: fetch, normalize, write to the matching cache.
//!
//! Each adapter reports `true` when its data was applied and `false` on
//! failure, in which case the cache is left as it was.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Local, Utc};
use dayahead_calendar::{CalendarCache, EventSource};
use dayahead_core::{Coordinates, TemperatureUnit};
use dayahead_news::{ArticleCache, NewsClient};
use dayahead_weather::{WeatherCache, WeatherProvider};

use crate::funfact::{fallback_fact, FunFactClient, FunFactHolder};
use crate::steps::{start_of_day, StepsHolder, StepsReading, StepsSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Weather,
    News,
    Calendar,
    FunFact,
    Steps,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Weather => "weather",
            Self::News => "news",
            Self::Calendar => "calendar",
            Self::FunFact => "fun fact",
            Self::Steps => "steps",
        };
        f.write_str(name)
    }
}

/// Inputs shared by every adapter for one refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshContext {
    pub location: Option<Coordinates>,
    pub unit: TemperatureUnit,
    pub now: DateTime<Utc>,
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Adapters that need a stored location are skipped without one.
    fn requires_location(&self) -> bool {
        false
    }

    async fn refresh(&self, ctx: &RefreshContext) -> bool;
}

pub struct WeatherAdapter {
    provider: WeatherProvider,
    cache: Arc<WeatherCache>,
}

impl WeatherAdapter {
    pub fn new(provider: WeatherProvider, cache: Arc<WeatherCache>) -> Self {
        Self { provider, cache }
    }
}

#[async_trait]
impl SourceAdapter for WeatherAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Weather
    }

    fn requires_location(&self) -> bool {
        true
    }

    async fn refresh(&self, ctx: &RefreshContext) -> bool {
        let Some(location) = ctx.location else {
            tracing::debug!("No location stored, weather not refreshed");
            return true;
        };

        let snapshot = match self.provider.fetch(location, ctx.unit).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Weather refresh failed (retryable: {}): {}", e.is_retryable(), e);
                return false;
            }
        };

        match self.cache.replace(&snapshot) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to store weather: {}", e);
                false
            }
        }
    }
}

pub struct NewsAdapter {
    client: NewsClient,
    cache: Arc<ArticleCache>,
}

impl NewsAdapter {
    pub fn new(client: NewsClient, cache: Arc<ArticleCache>) -> Self {
        Self { client, cache }
    }
}

#[async_trait]
impl SourceAdapter for NewsAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::News
    }

    async fn refresh(&self, _ctx: &RefreshContext) -> bool {
        let articles = match self.client.fetch_articles().await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::warn!("News refresh failed: {} ({})", e.user_message(), e);
                return false;
            }
        };

        if articles.is_empty() {
            tracing::info!("Feed had no usable headlines, keeping previous batch");
            return true;
        }

        match self.cache.replace_all(&articles) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to store headlines: {}", e);
                false
            }
        }
    }
}

pub struct CalendarAdapter {
    source: Arc<dyn EventSource>,
    cache: Arc<CalendarCache>,
    window: Duration,
    max_events: usize,
}

impl CalendarAdapter {
    pub fn new(
        source: Arc<dyn EventSource>,
        cache: Arc<CalendarCache>,
        window: Duration,
        max_events: usize,
    ) -> Self {
        Self {
            source,
            cache,
            window,
            max_events,
        }
    }
}

#[async_trait]
impl SourceAdapter for CalendarAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Calendar
    }

    fn requires_location(&self) -> bool {
        true
    }

    async fn refresh(&self, ctx: &RefreshContext) -> bool {
        if !self.source.has_permission().await {
            tracing::debug!("Calendar access not granted, clearing events");
            return match self.cache.replace_permission_denied() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Failed to clear calendar events: {}", e);
                    false
                }
            };
        }

        let query = match self
            .source
            .query_events(ctx.now, ctx.now + self.window, self.max_events)
            .await
        {
            Ok(query) => query,
            Err(e) => {
                tracing::warn!("Calendar query failed: {} ({})", e.user_message(), e);
                self.cache.mark_query_failed();
                return false;
            }
        };

        match self.cache.replace_all(&query.events, query.total_count) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to store calendar events: {}", e);
                false
            }
        }
    }
}

pub struct FunFactAdapter {
    client: FunFactClient,
    holder: Arc<FunFactHolder>,
}

impl FunFactAdapter {
    pub fn new(client: FunFactClient, holder: Arc<FunFactHolder>) -> Self {
        Self { client, holder }
    }
}

#[async_trait]
impl SourceAdapter for FunFactAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::FunFact
    }

    async fn refresh(&self, ctx: &RefreshContext) -> bool {
        let fact = match self.client.fetch().await {
            Ok(fact) => fact,
            Err(e) => {
                let day = ctx.now.with_timezone(&Local).ordinal();
                tracing::info!("Using fallback fun fact: {}", e);
                fallback_fact(day).to_string()
            }
        };

        self.holder.set(fact);
        true
    }
}

pub struct StepsAdapter {
    source: Arc<dyn StepsSource>,
    holder: Arc<StepsHolder>,
}

impl StepsAdapter {
    pub fn new(source: Arc<dyn StepsSource>, holder: Arc<StepsHolder>) -> Self {
        Self { source, holder }
    }
}

#[async_trait]
impl SourceAdapter for StepsAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Steps
    }

    async fn refresh(&self, ctx: &RefreshContext) -> bool {
        if !self.source.has_permission().await {
            tracing::debug!("Step count access not granted");
            self.holder.set(StepsReading::PermissionDenied);
            return true;
        }

        match self.source.steps_between(start_of_day(ctx.now), ctx.now).await {
            Ok(steps) => {
                self.holder.set(StepsReading::Today(steps));
                true
            }
            Err(e) => {
                tracing::warn!("Step count query failed: {}", e);
                false
            }
        }
    }
}
