//! News feed types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Categories published by the feed, in display order.
pub const CATEGORIES: [&str; 8] = [
    "Business",
    "Entertainment",
    "Health",
    "Science",
    "Sports",
    "Technology",
    "US",
    "World",
];

pub const DEFAULT_CATEGORY: &str = "US";

/// A stored headline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub source: Option<String>,
    pub url: Option<String>,
    pub category: String,
}

/// Raw feed: category name to article list. Categories may be missing or null.
pub type NewsFeed = BTreeMap<String, Option<Vec<ApiArticle>>>;

// API Response Types

#[derive(Debug, Clone, Deserialize)]
pub struct ApiArticle {
    pub title: Option<String>,
    pub source: Option<String>,
    #[serde(rename = "link")]
    pub url: Option<String>,
}

impl ApiArticle {
    fn into_article(self, category: &str) -> Option<Article> {
        let title = self.title?.trim().to_string();
        if title.is_empty() {
            return None;
        }
        Some(Article {
            title,
            source: self.source.filter(|s| !s.trim().is_empty()),
            url: self.url.filter(|u| !u.trim().is_empty()),
            category: category.to_string(),
        })
    }
}

/// Flatten a feed into one batch tagged by category, dropping articles
/// without a title. Known categories come first in display order, then any
/// others alphabetically; article order within a category is preserved.
pub fn normalize_feed(mut feed: NewsFeed) -> Vec<Article> {
    let mut ordered: Vec<(String, Vec<ApiArticle>)> = Vec::new();

    for category in CATEGORIES {
        if let Some(Some(articles)) = feed.remove(category) {
            ordered.push((category.to_string(), articles));
        }
    }
    for (category, articles) in feed {
        if let Some(articles) = articles {
            ordered.push((category, articles));
        }
    }

    ordered
        .into_iter()
        .flat_map(|(category, articles)| {
            articles
                .into_iter()
                .filter_map(move |a| a.into_article(&category))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn feed(json: &str) -> NewsFeed {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_normalize_drops_blank_titles() {
        let articles = normalize_feed(feed(
            r#"{
                "US": [
                    {"title": "Markets rally", "source": "Wire", "link": "https://example.com/a"},
                    {"title": "   ", "source": "Wire"},
                    {"source": "Nobody"}
                ]
            }"#,
        ));

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Markets rally");
        assert_eq!(articles[0].url.as_deref(), Some("https://example.com/a"));
        assert_eq!(articles[0].category, "US");
    }

    #[test]
    fn test_normalize_orders_categories() {
        let articles = normalize_feed(feed(
            r#"{
                "World": [{"title": "w1"}],
                "Local": [{"title": "l1"}],
                "Business": [{"title": "b1"}, {"title": "b2"}],
                "Health": null
            }"#,
        ));

        let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["b1", "b2", "w1", "l1"]);
        assert_eq!(articles[3].category, "Local");
    }

    #[test]
    fn test_normalize_empty_feed() {
        assert!(normalize_feed(feed("{}")).is_empty());
        assert!(normalize_feed(feed(r#"{"US": []}"#)).is_empty());
    }

    #[test]
    fn test_empty_optional_fields_become_none() {
        let articles = normalize_feed(feed(r#"{"US": [{"title": "t", "source": "", "link": " "}]}"#));
        assert!(articles[0].source.is_none());
        assert!(articles[0].url.is_none());
    }
}
