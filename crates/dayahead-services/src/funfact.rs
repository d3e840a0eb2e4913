//! Daily fun fact: remote random fact with a fixed fallback pool.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

const FUN_FACT_API_BASE: &str = "https://uselessfacts.jsph.pl";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Shown when the remote source is unavailable, picked by day of year.
pub const FALLBACK_FACTS: &[&str] = &[
    "Honey never spoils; edible honey has been found in ancient Egyptian tombs.",
    "Octopuses have three hearts and blue blood.",
    "A day on Venus is longer than a year on Venus.",
    "Bananas are berries, but strawberries are not.",
    "The Eiffel Tower can be about 15 cm taller in summer due to thermal expansion.",
    "Wombat droppings are cube-shaped.",
    "There are more possible games of chess than atoms in the observable universe.",
    "Sea otters hold hands while sleeping so they do not drift apart.",
    "A group of flamingos is called a flamboyance.",
    "Lightning strikes the Earth about 100 times every second.",
    "The shortest war in recorded history lasted less than an hour.",
    "Sharks existed before trees.",
];

#[derive(Error, Debug)]
pub enum FunFactError {
    #[error("Fun fact API returned status {0}")]
    Status(u16),

    #[error("Empty fun fact")]
    Empty,

    #[error("Invalid fun fact payload: {0}")]
    InvalidPayload(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Fallback fact for a 1-based day of the year.
pub fn fallback_fact(day_of_year: u32) -> &'static str {
    FALLBACK_FACTS[day_of_year as usize % FALLBACK_FACTS.len()]
}

#[derive(Debug, Deserialize)]
struct FunFactResponse {
    text: Option<String>,
}

pub struct FunFactClient {
    client: reqwest::Client,
    base_url: String,
    language: String,
}

impl FunFactClient {
    pub fn new(language: &str) -> Result<Self, FunFactError> {
        Self::with_base_url(FUN_FACT_API_BASE, language)
    }

    pub fn with_base_url(base_url: &str, language: &str) -> Result<Self, FunFactError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.to_string(),
        })
    }

    /// Fetch one random fact.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(&self) -> Result<String, FunFactError> {
        let url = format!(
            "{}/api/v2/facts/random.json?language={}",
            self.base_url,
            language_param(&self.language)
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FunFactError::Status(status.as_u16()));
        }

        let body: FunFactResponse = response
            .json()
            .await
            .map_err(|e| FunFactError::InvalidPayload(e.to_string()))?;

        body.text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(FunFactError::Empty)
    }
}

// Language codes are plain ASCII letters; anything else falls back to English.
fn language_param(language: &str) -> &str {
    if !language.is_empty() && language.chars().all(|c| c.is_ascii_alphabetic()) {
        language
    } else {
        "en"
    }
}

/// In-memory holder for the current fact.
pub struct FunFactHolder {
    tx: watch::Sender<Option<String>>,
}

impl Default for FunFactHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl FunFactHolder {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn get(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    pub fn set(&self, fact: String) {
        self.tx.send_if_modified(|current| {
            if current.as_deref() == Some(fact.as_str()) {
                false
            } else {
                *current = Some(fact);
                true
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        rx
    }
}
