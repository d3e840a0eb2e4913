//! Read path for the home-screen widget.
//!
//! The widget runs outside the dashboard process, so it reads the persisted
//! weather row and summary straight from the cache files. Missing or corrupt
//! data degrades to the placeholder text.

use std::path::Path;

use dayahead_weather::{icon_name, WeatherSnapshot};
use serde::Serialize;

pub const WEATHER_CACHE_FILE: &str = "weather_cache.db";
pub const NEWS_CACHE_FILE: &str = "news_cache.db";
pub const CALENDAR_CACHE_FILE: &str = "calendar_cache.db";
pub const PREFERENCES_FILE: &str = "preferences.db";

pub const WIDGET_PLACEHOLDER: &str = "Your daily summary will appear here.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetWeather {
    pub temperature: i64,
    /// "°C" or "°F"
    pub unit: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

impl From<&WeatherSnapshot> for WidgetWeather {
    fn from(snapshot: &WeatherSnapshot) -> Self {
        Self {
            temperature: snapshot.rounded_temperature(),
            unit: snapshot.unit.symbol(),
            description: snapshot.condition().description(),
            icon: icon_name(snapshot.current.weather_code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetSnapshot {
    pub weather: Option<WidgetWeather>,
    pub summary: String,
}

impl WidgetSnapshot {
    pub fn from_parts(weather: Option<&WeatherSnapshot>, summary: Option<String>) -> Self {
        let summary = summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| WIDGET_PLACEHOLDER.to_string());

        Self {
            weather: weather.map(WidgetWeather::from),
            summary,
        }
    }

    pub fn has_summary(&self) -> bool {
        self.summary != WIDGET_PLACEHOLDER
    }
}

/// Read the widget contents from the cache files in `data_dir`.
pub fn read_widget_snapshot<P: AsRef<Path>>(data_dir: P) -> WidgetSnapshot {
    let data_dir = data_dir.as_ref();
    let weather = dayahead_weather::read_snapshot(data_dir.join(WEATHER_CACHE_FILE));
    let summary = dayahead_core::read_persisted_summary(data_dir.join(PREFERENCES_FILE));

    WidgetSnapshot::from_parts(weather.as_ref(), summary)
}
