//! News headlines for Day Ahead.
//!
//! Provides the category feed client and the offline article cache.

pub mod cache;
pub mod client;
pub mod error;
pub mod types;

pub use cache::ArticleCache;
pub use client::NewsClient;
pub use error::NewsError;
pub use types::{normalize_feed, Article, NewsFeed, CATEGORIES, DEFAULT_CATEGORY};
