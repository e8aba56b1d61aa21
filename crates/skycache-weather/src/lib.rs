//! Per-API-key weather lookup with transparent caching.
//!
//! Resolves city names through OpenWeather geocoding, fetches current weather
//! for their coordinates, and keeps a small bounded cache per API key that is
//! refreshed lazily on lookup or eagerly in the background.

pub mod cache;
pub mod error;
pub mod geocode;
mod http;
pub mod provider;
pub mod registry;
pub mod types;

pub use cache::{CityCache, CitySnapshot};
pub use error::WeatherError;
pub use geocode::{GeoResolver, OpenWeatherGeocoder};
pub use provider::{OpenWeatherProvider, WeatherFetcher};
pub use registry::CacheRegistry;
pub use types::*;
