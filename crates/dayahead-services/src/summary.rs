//! Daily summary text.

use dayahead_calendar::{CalendarSnapshot, CalendarStatus};
use dayahead_weather::WeatherSnapshot;

/// Everything the summary is built from.
#[derive(Debug, Clone, Copy)]
pub struct SummaryInputs<'a> {
    pub weather: Option<&'a WeatherSnapshot>,
    pub calendar: Option<&'a CalendarSnapshot>,
    pub headline: Option<&'a str>,
    pub user_name: &'a str,
    /// Local hour of day, 0..=23
    pub hour: u32,
}

pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good morning",
        12..=16 => "Good afternoon",
        _ => "Good evening",
    }
}

/// e.g. "partly cloudy and 18°C"
pub fn weather_phrase(weather: &WeatherSnapshot) -> String {
    format!(
        "{} and {}{}",
        weather.condition().description(),
        weather.rounded_temperature(),
        weather.unit.symbol()
    )
}

pub fn events_phrase(calendar: Option<&CalendarSnapshot>) -> String {
    let Some(calendar) = calendar else {
        return "You have no events in the next 24 hours.".to_string();
    };

    if calendar.status == CalendarStatus::QueryFailed {
        return "Your calendar is unavailable.".to_string();
    }

    let count = calendar.total_count.max(calendar.events.len());
    match (count, calendar.first()) {
        (0, _) => "You have no events in the next 24 hours.".to_string(),
        (1, Some(first)) => format!("You have 1 event coming up: {}.", first.title),
        (n, Some(first)) => format!(
            "You have {} events coming up, starting with {}.",
            n, first.title
        ),
        (1, None) => "You have 1 event coming up.".to_string(),
        (n, None) => format!("You have {} events coming up.", n),
    }
}

pub fn news_phrase(headline: Option<&str>) -> String {
    match headline.map(str::trim).filter(|h| !h.is_empty()) {
        Some(title) => format!("Top story: {}.", title),
        None => "No major news today.".to_string(),
    }
}

/// Build the summary. Absent until weather is known.
pub fn compose(inputs: &SummaryInputs<'_>) -> Option<String> {
    let weather = inputs.weather?;

    let name = match inputs.user_name.trim() {
        "" => dayahead_core::preferences::DEFAULT_USER_NAME,
        name => name,
    };

    Some(format!(
        "{}, {}. It's {}. {} {}",
        greeting(inputs.hour),
        name,
        weather_phrase(weather),
        events_phrase(inputs.calendar),
        news_phrase(inputs.headline)
    ))
}
