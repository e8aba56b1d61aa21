//! Direct geocoding: convert a city name to coordinates.
//! Uses the OpenWeather geocoding endpoint with the cache's API key.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use skycache_core::{NetworkError, OpenWeatherConfig};
use tracing::instrument;

use crate::error::WeatherError;
use crate::http;
use crate::types::Coordinates;

/// Resolves a city name to coordinates.
///
/// Implementations do no caching and no retries; the city cache calls this
/// once per admitted city.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    /// Fails with [`WeatherError::LookupFailed`] on any transport, status or
    /// response-shape problem, including "no such city".
    async fn resolve(&self, city: &str) -> Result<Coordinates, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct GeocodingMatch {
    lat: f64,
    lon: f64,
}

/// OpenWeather direct geocoding client.
#[derive(Debug, Clone)]
pub struct OpenWeatherGeocoder {
    client: Arc<Client>,
    url: String,
    api_key: String,
}

impl OpenWeatherGeocoder {
    pub fn new(client: Arc<Client>, config: &OpenWeatherConfig, api_key: &str) -> Self {
        Self {
            client,
            url: config.geocoding_url.clone(),
            api_key: api_key.to_string(),
        }
    }

    async fn first_match(&self, city: &str) -> Result<Coordinates, NetworkError> {
        let request = self.client.get(&self.url).query(&[
            ("q", city),
            ("limit", "1"),
            ("appid", self.api_key.as_str()),
        ]);

        let matches: Vec<GeocodingMatch> = http::get_json(request).await?;
        let first = matches
            .into_iter()
            .next()
            .ok_or_else(|| NetworkError::NotFound(city.to_string()))?;

        Ok(Coordinates::new(first.lat, first.lon))
    }
}

#[async_trait]
impl GeoResolver for OpenWeatherGeocoder {
    #[instrument(skip(self), level = "debug")]
    async fn resolve(&self, city: &str) -> Result<Coordinates, WeatherError> {
        let coordinates = self
            .first_match(city)
            .await
            .map_err(|source| WeatherError::LookupFailed {
                city: city.to_string(),
                source,
            })?;

        tracing::debug!("Resolved {} to {}", city, coordinates);
        Ok(coordinates)
    }
}
