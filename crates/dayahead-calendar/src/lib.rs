//! Upcoming calendar events for Day Ahead.
//!
//! Provides the event source seam, a Google Calendar client behind it, and
//! the offline event cache.

pub mod cache;
pub mod client;
pub mod error;
pub mod source;
pub mod types;

pub use cache::CalendarCache;
pub use client::CalendarClient;
pub use error::CalendarError;
pub use source::{select_window, EventSource, NoCalendarAccess};
pub use types::{CalendarEvent, CalendarSnapshot, CalendarStatus, EventQuery, NO_TITLE};
