//! Where upcoming events come from.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::CalendarError;
use crate::types::{CalendarEvent, EventQuery};

/// A calendar the user may or may not have granted access to.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Whether events may be read at all.
    async fn has_permission(&self) -> bool;

    /// Events starting in `[start, end]`, ascending, at most `limit` of
    /// them, plus the uncapped count.
    async fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<EventQuery, CalendarError>;
}

/// Source used when no calendar is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCalendarAccess;

#[async_trait]
impl EventSource for NoCalendarAccess {
    async fn has_permission(&self) -> bool {
        false
    }

    async fn query_events(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _limit: usize,
    ) -> Result<EventQuery, CalendarError> {
        Ok(EventQuery::default())
    }
}

/// Keep events starting within `[now, now + window]`, sorted ascending and
/// capped at `limit`. The count covers the whole window.
pub fn select_window(
    mut events: Vec<CalendarEvent>,
    now: DateTime<Utc>,
    window: Duration,
    limit: usize,
) -> EventQuery {
    let end = now + window;
    events.retain(|e| e.start >= now && e.start <= end);
    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

    let total_count = events.len();
    events.truncate(limit);

    EventQuery {
        events,
        total_count,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use chrono::TimeZone;

    fn event(id: &str, start: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            title: id.to_uppercase(),
            start,
            end: start + Duration::minutes(30),
            location: None,
            owner: None,
        }
    }

    #[test]
    fn test_select_window_filters_sorts_and_caps() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        let events = vec![
            event("late", now + Duration::hours(20)),
            event("past", now - Duration::minutes(1)),
            event("soon", now + Duration::minutes(15)),
            event("tomorrow", now + Duration::hours(25)),
            event("noon", now + Duration::hours(4)),
            event("edge", now + Duration::hours(24)),
        ];

        let query = select_window(events, now, Duration::hours(24), 3);

        assert_eq!(query.total_count, 4);
        let ids: Vec<_> = query.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["soon", "noon", "late"]);
    }

    #[test]
    fn test_select_window_empty() {
        let now = Utc::now();
        let query = select_window(Vec::new(), now, Duration::hours(24), 3);
        assert_eq!(query, EventQuery::default());
    }

    #[tokio::test]
    async fn test_no_calendar_access() {
        let source = NoCalendarAccess;
        assert!(!source.has_permission().await);
        let now = Utc::now();
        let query = source.query_events(now, now, 3).await.unwrap();
        assert!(query.events.is_empty());
    }
}
