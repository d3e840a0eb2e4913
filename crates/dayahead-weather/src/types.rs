use chrono::{DateTime, Utc};
use dayahead_core::TemperatureUnit;
use serde::{Deserialize, Serialize};

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    ClearSky,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    Drizzle,
    Rain,
    SnowFall,
    RainShowers,
    Thunderstorm,
    ThunderstormWithHail,
    Unknown,
}

impl WeatherCondition {
    /// Convert WMO weather code to WeatherCondition
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::ClearSky,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            61 | 63 | 65 => Self::Rain,
            71 | 73 | 75 => Self::SnowFall,
            80 | 81 | 82 => Self::RainShowers,
            95 => Self::Thunderstorm,
            96 | 99 => Self::ThunderstormWithHail,
            _ => Self::Unknown,
        }
    }

    /// Human-readable description, lower case so it reads inside a sentence
    pub fn description(&self) -> &'static str {
        match self {
            Self::ClearSky => "clear",
            Self::MainlyClear => "mainly clear",
            Self::PartlyCloudy => "partly cloudy",
            Self::Overcast => "overcast",
            Self::Fog => "foggy",
            Self::Drizzle => "drizzling",
            Self::Rain => "raining",
            Self::SnowFall => "snowing",
            Self::RainShowers => "showery",
            Self::Thunderstorm => "stormy",
            Self::ThunderstormWithHail => "stormy with hail",
            Self::Unknown => "unknown conditions",
        }
    }
}

/// Icon name for a WMO code. Coarser than [`WeatherCondition`]: snow
/// showers (85, 86) still get the snow icon even though they have no
/// dedicated description.
pub fn icon_name(code: i32) -> &'static str {
    match code {
        0 => "sunny",
        1 | 2 => "partly_cloudy",
        3 => "cloudy",
        45 | 48 => "foggy",
        51 | 53 | 55 | 61 | 63 | 65 | 80 | 81 | 82 => "rainy",
        71 | 73 | 75 | 85 | 86 => "snowy",
        95 | 96 | 99 => "thunderstorm",
        _ => "cloudy",
    }
}

/// Current conditions as reported by the forecast endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub weather_code: i32,
    /// Local observation time, as sent by the API
    pub time: String,
}

/// Daily forecast columns; all vectors share the same length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DailyForecast {
    pub dates: Vec<String>,
    pub weather_codes: Vec<i32>,
    pub temperature_max: Vec<f64>,
    pub temperature_min: Vec<f64>,
}

/// The single persisted weather record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub latitude: f64,
    pub longitude: f64,
    pub current: CurrentConditions,
    pub daily: Option<DailyForecast>,
    pub unit: TemperatureUnit,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_wmo_code(self.current.weather_code)
    }

    /// Current temperature rounded to the nearest whole degree
    pub fn rounded_temperature(&self) -> i64 {
        self.current.temperature.round() as i64
    }

    /// Today's high and low, when the daily block was returned
    pub fn today_range(&self) -> Option<(f64, f64)> {
        let daily = self.daily.as_ref()?;
        Some((*daily.temperature_max.first()?, *daily.temperature_min.first()?))
    }

    /// Normalize a forecast response. Rejects payloads that cannot be
    /// displayed: non-finite temperatures or ragged daily columns.
    pub fn from_api(
        api: ForecastResponse,
        unit: TemperatureUnit,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, WeatherError> {
        if !api.current.temperature_2m.is_finite() {
            return Err(WeatherError::Parse("current temperature is not finite".into()));
        }

        let daily = match api.daily {
            Some(d) => {
                if d.temperature_2m_max.len() != d.temperature_2m_min.len() {
                    return Err(WeatherError::Parse(format!(
                        "daily max/min length mismatch: {} vs {}",
                        d.temperature_2m_max.len(),
                        d.temperature_2m_min.len()
                    )));
                }
                if !d.time.is_empty() && d.time.len() != d.temperature_2m_max.len() {
                    return Err(WeatherError::Parse("daily dates do not match temperatures".into()));
                }
                Some(DailyForecast {
                    dates: d.time,
                    weather_codes: d.weather_code,
                    temperature_max: d.temperature_2m_max,
                    temperature_min: d.temperature_2m_min,
                })
            }
            None => None,
        };

        Ok(Self {
            latitude: api.latitude,
            longitude: api.longitude,
            current: CurrentConditions {
                temperature: api.current.temperature_2m,
                weather_code: api.current.weather_code,
                time: api.current.time,
            },
            daily,
            unit,
            fetched_at,
        })
    }
}

// API Response Types

/// Open-Meteo forecast response.
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub current: ApiCurrent,
    pub daily: Option<ApiDaily>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCurrent {
    pub temperature_2m: f64,
    pub weather_code: i32,
    pub time: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiDaily {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub weather_code: Vec<i32>,
    #[serde(default)]
    pub temperature_2m_max: Vec<f64>,
    #[serde(default)]
    pub temperature_2m_min: Vec<f64>,
}

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("No place found for coordinates")]
    NotFound,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather API returned status {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Cache error: {0}")]
    Cache(String),
}

impl WeatherError {
    /// Whether a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status(code) => *code >= 500 || *code == 429,
            Self::Parse(_) | Self::Cache(_) => false,
        }
    }
}
