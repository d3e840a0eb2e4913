//! Weather for Day Ahead
//!
//! Open-Meteo forecasts, a single-snapshot SQLite cache and reverse
//! geocoding of the stored location.

pub mod cache;
pub mod geocode;
pub mod provider;
pub mod types;

pub use cache::{read_snapshot, WeatherCache};
pub use geocode::{LocationResolver, NominatimResolver};
pub use provider::WeatherProvider;
pub use types::*;
