//! Open-Meteo forecast client.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dayahead_core::{Coordinates, TemperatureUnit};
use reqwest::Client;
use tracing::instrument;

use crate::types::{ForecastResponse, WeatherError, WeatherSnapshot};

const OPEN_METEO_BASE: &str = "https://api.open-meteo.com";
const REQUEST_TIMEOUT_SECS: u64 = 10;

pub const CURRENT_FIELDS: &str = "temperature_2m,weather_code";
pub const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min";

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
}

impl WeatherProvider {
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_base_url(OPEN_METEO_BASE)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch current conditions and the daily forecast for a location.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(
        &self,
        coordinates: Coordinates,
        unit: TemperatureUnit,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let url = format!(
            "{}/v1/forecast?latitude={}&longitude={}&current={}&daily={}&temperature_unit={}&timezone=auto",
            self.base_url,
            coordinates.latitude,
            coordinates.longitude,
            urlencoding::encode(CURRENT_FIELDS),
            urlencoding::encode(DAILY_FIELDS),
            unit.as_str(),
        );

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Forecast request returned status {}", status);
            return Err(WeatherError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let api: ForecastResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::Parse(format!("Invalid forecast payload: {}", e)))?;

        WeatherSnapshot::from_api(api, unit, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn forecast_body() -> serde_json::Value {
        serde_json::json!({
            "latitude": 47.6,
            "longitude": -122.3,
            "current": {"temperature_2m": 64.4, "weather_code": 2, "time": "2026-10-19T09:00"},
            "daily": {
                "time": ["2026-10-19"],
                "weather_code": [2],
                "temperature_2m_max": [66.0],
                "temperature_2m_min": [51.1]
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_sends_expected_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "47.6"))
            .and(query_param("longitude", "-122.3"))
            .and(query_param("current", CURRENT_FIELDS))
            .and(query_param("daily", DAILY_FIELDS))
            .and(query_param("temperature_unit", "fahrenheit"))
            .and(query_param("timezone", "auto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = WeatherProvider::with_base_url(&mock_server.uri()).unwrap();
        let snapshot = provider
            .fetch(Coordinates::new(47.6, -122.3), TemperatureUnit::Fahrenheit)
            .await
            .unwrap();

        assert_eq!(snapshot.unit, TemperatureUnit::Fahrenheit);
        assert_eq!(snapshot.rounded_temperature(), 64);
        assert_eq!(snapshot.today_range(), Some((66.0, 51.1)));
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let provider = WeatherProvider::with_base_url(&mock_server.uri()).unwrap();
        let result = provider
            .fetch(Coordinates::new(0.0, 0.0), TemperatureUnit::Celsius)
            .await;

        assert!(matches!(result, Err(WeatherError::Status(503))));
    }

    #[tokio::test]
    async fn test_fetch_malformed_payload() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"latitude\": 1.0}"))
            .mount(&mock_server)
            .await;

        let provider = WeatherProvider::with_base_url(&mock_server.uri()).unwrap();
        let result = provider
            .fetch(Coordinates::new(0.0, 0.0), TemperatureUnit::Celsius)
            .await;

        assert!(matches!(result, Err(WeatherError::Parse(_))));
    }
}
