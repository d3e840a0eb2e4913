//! Calendar types and data structures.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Title stored for events that have none.
pub const NO_TITLE: &str = "No Title";

/// Upcoming event as stored locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    /// Display name of the calendar the event belongs to
    pub owner: Option<String>,
}

/// How the last calendar refresh ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalendarStatus {
    #[default]
    Ok,
    /// No access was granted; the stored set is empty.
    PermissionDenied,
    /// The query failed; the stored set is whatever the last good refresh wrote.
    QueryFailed,
}

/// Stored events plus the size of the window they were taken from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CalendarSnapshot {
    /// Ascending by start, capped
    pub events: Vec<CalendarEvent>,
    /// Number of events in the whole window before capping
    pub total_count: usize,
    pub status: CalendarStatus,
}

impl CalendarSnapshot {
    pub fn first(&self) -> Option<&CalendarEvent> {
        self.events.first()
    }
}

/// Result of one event query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventQuery {
    pub events: Vec<CalendarEvent>,
    pub total_count: usize,
}

// API Response Types

/// Google Calendar API event response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub id: String,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub start: Option<ApiEventTime>,
    pub end: Option<ApiEventTime>,
    pub organizer: Option<ApiOrganizer>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiOrganizer {
    pub email: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

/// API response for event list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    #[serde(default)]
    pub items: Vec<ApiEvent>,
    pub next_page_token: Option<String>,
}

impl CalendarEvent {
    /// Convert an API event. Cancelled events and events without a usable
    /// start time are dropped.
    pub fn from_api(api: ApiEvent) -> Option<Self> {
        if api.status.as_deref() == Some("cancelled") {
            return None;
        }

        let start = api.start.as_ref().and_then(parse_event_time)?;
        let end = api
            .end
            .as_ref()
            .and_then(parse_event_time)
            .filter(|end| *end >= start)
            .unwrap_or(start);

        let title = api
            .summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| NO_TITLE.to_string());

        Some(Self {
            id: api.id,
            title,
            start,
            end,
            location: api.location.filter(|l| !l.trim().is_empty()),
            owner: api.organizer.and_then(|o| o.display_name.or(o.email)),
        })
    }
}

fn parse_event_time(api: &ApiEventTime) -> Option<DateTime<Utc>> {
    if let Some(dt_str) = &api.date_time {
        if let Ok(dt) = DateTime::parse_from_rfc3339(dt_str) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    if let Some(date_str) = &api.date {
        if let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn test_event_from_api() {
        let json = r#"{
            "id": "event123",
            "summary": "Team Meeting",
            "location": "Conference Room A",
            "start": {"dateTime": "2024-02-01T10:00:00Z"},
            "end": {"dateTime": "2024-02-01T11:00:00Z"},
            "organizer": {"email": "team@example.com", "displayName": "Team"},
            "status": "confirmed"
        }"#;

        let api_event: ApiEvent = serde_json::from_str(json).unwrap();
        let event = CalendarEvent::from_api(api_event).unwrap();

        assert_eq!(event.id, "event123");
        assert_eq!(event.title, "Team Meeting");
        assert_eq!(event.location.as_deref(), Some("Conference Room A"));
        assert_eq!(event.owner.as_deref(), Some("Team"));
        assert_eq!(event.end - event.start, chrono::Duration::hours(1));
    }

    #[test]
    fn test_missing_title_becomes_no_title() {
        let json = r#"{"id": "e1", "start": {"dateTime": "2024-02-01T10:00:00+01:00"}}"#;
        let api_event: ApiEvent = serde_json::from_str(json).unwrap();
        let event = CalendarEvent::from_api(api_event).unwrap();

        assert_eq!(event.title, NO_TITLE);
        assert_eq!(event.start.to_rfc3339(), "2024-02-01T09:00:00+00:00");
        assert_eq!(event.end, event.start);
    }

    #[test]
    fn test_all_day_event() {
        let json = r#"{"id": "e2", "summary": "Holiday", "start": {"date": "2024-02-01"}, "end": {"date": "2024-02-02"}}"#;
        let api_event: ApiEvent = serde_json::from_str(json).unwrap();
        let event = CalendarEvent::from_api(api_event).unwrap();

        assert_eq!(event.start.to_rfc3339(), "2024-02-01T00:00:00+00:00");
    }

    #[test]
    fn test_cancelled_and_unscheduled_are_dropped() {
        let cancelled: ApiEvent = serde_json::from_str(
            r#"{"id": "c", "status": "cancelled", "start": {"dateTime": "2024-02-01T10:00:00Z"}}"#,
        )
        .unwrap();
        assert!(CalendarEvent::from_api(cancelled).is_none());

        let unscheduled: ApiEvent = serde_json::from_str(r#"{"id": "u", "summary": "?"}"#).unwrap();
        assert!(CalendarEvent::from_api(unscheduled).is_none());
    }
}
