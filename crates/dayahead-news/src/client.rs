//! News feed client.

use std::time::Duration;

use tracing::instrument;

use crate::error::NewsError;
use crate::types::{normalize_feed, Article, NewsFeed};

const NEWS_API_BASE: &str = "https://saurav.tech/NewsAPI";
const REQUEST_TIMEOUT_SECS: u64 = 10;

pub struct NewsClient {
    client: reqwest::Client,
    base_url: String,
}

impl NewsClient {
    pub fn new() -> Result<Self, NewsError> {
        Self::with_base_url(NEWS_API_BASE)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, NewsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the raw category feed.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_feed(&self) -> Result<NewsFeed, NewsError> {
        let url = format!("{}/news-feed", self.base_url);
        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    /// Fetch the feed and flatten it into a single tagged batch.
    pub async fn fetch_articles(&self) -> Result<Vec<Article>, NewsError> {
        let feed = self.fetch_feed().await?;
        let articles = normalize_feed(feed);
        tracing::info!("Fetched {} headlines", articles.len());
        Ok(articles)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, NewsError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| NewsError::InvalidPayload(e.to_string()))
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(NewsError::RateLimited(retry_after))
        } else {
            Err(NewsError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_articles() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/news-feed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "US": [
                    {"title": "Senate passes budget", "source": "AP", "link": "https://example.com/1"},
                    {"title": "", "source": "AP"}
                ],
                "Technology": [
                    {"title": "New chip announced", "source": "Verge"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = NewsClient::with_base_url(&mock_server.uri()).unwrap();
        let articles = client.fetch_articles().await.unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].category, "Technology");
        assert_eq!(articles[1].title, "Senate passes budget");
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/news-feed"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "15"))
            .mount(&mock_server)
            .await;

        let client = NewsClient::with_base_url(&mock_server.uri()).unwrap();
        let result = client.fetch_feed().await;

        assert!(matches!(result, Err(NewsError::RateLimited(15))));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/news-feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = NewsClient::with_base_url(&mock_server.uri()).unwrap();
        let result = client.fetch_feed().await;

        assert!(matches!(result, Err(NewsError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn test_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/news-feed"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = NewsClient::with_base_url(&mock_server.uri()).unwrap();
        let err = client.fetch_feed().await.unwrap_err();

        assert!(matches!(err, NewsError::Status(500)));
        assert!(err.is_retryable());
    }
}
