//! Google Calendar API client.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::error::CalendarError;
use crate::source::{select_window, EventSource};
use crate::types::*;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const MAX_PAGES: usize = 5;

pub struct CalendarClient {
    client: reqwest::Client,
    access_token: String,
    calendar_id: String,
    base_url: String,
}

impl CalendarClient {
    pub fn new(access_token: &str, calendar_id: &str) -> Result<Self, CalendarError> {
        Self::with_base_url(access_token, calendar_id, CALENDAR_API_BASE)
    }

    pub fn with_base_url(
        access_token: &str,
        calendar_id: &str,
        base_url: &str,
    ) -> Result<Self, CalendarError> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            access_token: access_token.to_string(),
            calendar_id: calendar_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// List one page of events starting within a time range.
    #[instrument(skip(self), level = "info")]
    pub async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<EventListResponse, CalendarError> {
        let mut url = format!(
            "{}/calendars/{}/events?timeMin={}&timeMax={}&singleEvents=true&orderBy=startTime&maxResults=50",
            self.base_url,
            urlencoding::encode(&self.calendar_id),
            urlencoding::encode(&time_min.to_rfc3339()),
            urlencoding::encode(&time_max.to_rfc3339()),
        );

        if let Some(pt) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(pt)));
        }

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Every event in the range, following page tokens.
    pub async fn list_all_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page = self
                .list_events(time_min, time_max, page_token.as_deref())
                .await?;
            events.extend(page.items.into_iter().filter_map(CalendarEvent::from_api));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(events),
            }
        }

        tracing::warn!("Stopped paging calendar events after {} pages", MAX_PAGES);
        Ok(events)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, CalendarError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| CalendarError::ApiError(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 {
            Err(CalendarError::TokenRejected)
        } else if status.as_u16() == 403 {
            Err(CalendarError::AccessDenied)
        } else if status.as_u16() == 404 {
            Err(CalendarError::CalendarNotFound(self.calendar_id.clone()))
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(CalendarError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(CalendarError::ApiError(format!("{}: {}", status, text)))
        }
    }
}

#[async_trait]
impl EventSource for CalendarClient {
    async fn has_permission(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    async fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<EventQuery, CalendarError> {
        let events = self.list_all_events(start, end).await?;
        // The API's timeMin filters on end time, so narrow again by start.
        Ok(select_window(events, start, end - start, limit))
    }
}
