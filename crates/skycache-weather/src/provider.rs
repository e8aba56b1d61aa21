//! Current-weather client for the OpenWeather API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use skycache_core::{NetworkError, OpenWeatherConfig};
use tracing::instrument;

use crate::error::WeatherError;
use crate::http;
use crate::types::{Conditions, Coordinates, SunTimes, Temperature, WeatherReport, Wind};

/// Fetches current weather for a coordinate pair.
#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    /// Fails with [`WeatherError::FetchFailed`]. No retries are attempted;
    /// the caller's freshness policy retries on its next pass.
    async fn fetch(&self, coordinates: Coordinates) -> Result<WeatherReport, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ApiMain {
    temp: f64,
    feels_like: f64,
}

#[derive(Debug, Deserialize)]
struct ApiWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ApiSys {
    sunrise: i64,
    sunset: i64,
}

/// Subset of the `/data/2.5/weather` response that the report is built from.
#[derive(Debug, Deserialize)]
struct ApiCurrentWeather {
    weather: Vec<ApiCondition>,
    main: ApiMain,
    visibility: i64,
    wind: ApiWind,
    dt: i64,
    sys: ApiSys,
    timezone: i64,
    name: String,
}

impl ApiCurrentWeather {
    /// Reshape the provider payload into the normalized report.
    fn into_report(self) -> Result<WeatherReport, NetworkError> {
        let condition = self.weather.into_iter().next().ok_or_else(|| {
            NetworkError::InvalidResponse("weather conditions array is empty".to_string())
        })?;

        Ok(WeatherReport {
            weather: Conditions {
                main: condition.main,
                description: condition.description,
            },
            temperature: Temperature {
                temp: self.main.temp,
                feels_like: self.main.feels_like,
            },
            visibility: self.visibility,
            wind: Wind {
                speed: self.wind.speed,
            },
            datetime: self.dt,
            sys: SunTimes {
                sunrise: self.sys.sunrise,
                sunset: self.sys.sunset,
            },
            timezone: self.timezone,
            name: self.name,
        })
    }
}

/// OpenWeather current-weather client.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Arc<Client>,
    url: String,
    api_key: String,
}

impl OpenWeatherProvider {
    pub fn new(client: Arc<Client>, config: &OpenWeatherConfig, api_key: &str) -> Self {
        Self {
            client,
            url: config.weather_url.clone(),
            api_key: api_key.to_string(),
        }
    }

    async fn current(&self, coordinates: Coordinates) -> Result<WeatherReport, NetworkError> {
        let request = self.client.get(&self.url).query(&[
            ("lat", coordinates.latitude.to_string()),
            ("lon", coordinates.longitude.to_string()),
            ("appid", self.api_key.clone()),
        ]);

        let raw: ApiCurrentWeather = http::get_json(request).await?;
        raw.into_report()
    }
}

#[async_trait]
impl WeatherFetcher for OpenWeatherProvider {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, coordinates: Coordinates) -> Result<WeatherReport, WeatherError> {
        self.current(coordinates)
            .await
            .map_err(|source| WeatherError::FetchFailed {
                latitude: coordinates.latitude,
                longitude: coordinates.longitude,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "coord": {"lon": 2.35, "lat": 48.85},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "base": "stations",
        "main": {"temp": 290.1, "feels_like": 289.4, "temp_min": 288.0, "temp_max": 292.0, "pressure": 1015, "humidity": 60},
        "visibility": 10000,
        "wind": {"speed": 4.1, "deg": 240},
        "clouds": {"all": 0},
        "dt": 1700000000,
        "sys": {"type": 2, "id": 2041230, "country": "FR", "sunrise": 1699987000, "sunset": 1700021000},
        "timezone": 3600,
        "id": 2988507,
        "name": "Paris",
        "cod": 200
    }"#;

    #[test]
    fn test_reshapes_provider_response() {
        let raw: ApiCurrentWeather = serde_json::from_str(SAMPLE).unwrap();
        let report = raw.into_report().unwrap();

        assert_eq!(report.weather.main, "Clear");
        assert_eq!(report.weather.description, "clear sky");
        assert_eq!(report.temperature.temp, 290.1);
        assert_eq!(report.temperature.feels_like, 289.4);
        assert_eq!(report.visibility, 10000);
        assert_eq!(report.wind.speed, 4.1);
        assert_eq!(report.datetime, 1_700_000_000);
        assert_eq!(report.sys.sunrise, 1_699_987_000);
        assert_eq!(report.sys.sunset, 1_700_021_000);
        assert_eq!(report.timezone, 3600);
        assert_eq!(report.name, "Paris");
    }

    #[test]
    fn test_empty_conditions_is_invalid_response() {
        let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        value["weather"] = serde_json::json!([]);
        let raw: ApiCurrentWeather = serde_json::from_value(value).unwrap();

        let err = raw.into_report().unwrap_err();
        assert!(matches!(err, NetworkError::InvalidResponse(_)));
    }

    #[test]
    fn test_missing_field_does_not_parse() {
        let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        value.as_object_mut().unwrap().remove("visibility");
        assert!(serde_json::from_value::<ApiCurrentWeather>(value).is_err());
    }
}
