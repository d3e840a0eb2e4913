//! Reverse geocoding: convert coordinates to human-readable place names.
//! Uses Nominatim (OpenStreetMap) - free, no API key required.

use std::time::Duration;

use async_trait::async_trait;
use dayahead_core::Coordinates;
use reqwest::Client;
use serde::Deserialize;

use crate::types::LocationError;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "DayAhead/0.1.0";

/// Resolves coordinates to a display name.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self, coordinates: Coordinates) -> Result<String, LocationError>;
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state_district: Option<String>,
    state: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

/// Pick "Place, Region" from an address, preferring the most specific place.
fn format_place(addr: NominatimAddress) -> Option<String> {
    let state = addr.state.clone();
    let country = addr.country.clone();

    let place = addr
        .city
        .or(addr.town)
        .or(addr.village)
        .or(addr.municipality)
        .or(addr.state_district)
        .or(addr.county)
        .or(addr.state)
        .or(addr.country)
        .filter(|p| !p.trim().is_empty())?;

    let suffix = [state, country]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty() && *s != place);

    Some(match suffix {
        Some(s) => format!("{}, {}", place, s),
        None => place,
    })
}

#[derive(Debug, Clone)]
pub struct NominatimResolver {
    client: Client,
    base_url: String,
}

impl NominatimResolver {
    pub fn new() -> Result<Self, LocationError> {
        Self::with_base_url(NOMINATIM_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, LocationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LocationError::Other(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LocationResolver for NominatimResolver {
    async fn resolve(&self, coordinates: Coordinates) -> Result<String, LocationError> {
        let url = format!(
            "{}?lat={}&lon={}&format=json&addressdetails=1&layer=address&zoom=10",
            self.base_url, coordinates.latitude, coordinates.longitude
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                LocationError::Timeout
            } else {
                tracing::debug!("Reverse geocode request failed: {}", e);
                LocationError::ServiceUnavailable
            }
        })?;

        if !response.status().is_success() {
            tracing::debug!("Reverse geocode returned status {}", response.status());
            return Err(LocationError::ServiceUnavailable);
        }

        let body: NominatimResponse = response
            .json()
            .await
            .map_err(|e| LocationError::Other(format!("Invalid geocode payload: {}", e)))?;

        let name = body
            .address
            .and_then(format_place)
            .ok_or(LocationError::NotFound)?;

        tracing::info!("Reverse geocoded to: {}", name);
        Ok(name)
    }
}
