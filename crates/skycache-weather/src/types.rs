use serde::{Deserialize, Serialize};

pub use skycache_core::RefreshMode;

/// Geographic position of a city, resolved once per cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Short condition summary, e.g. `Clear` / `clear sky`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Conditions {
    pub main: String,
    pub description: String,
}

/// Temperatures in the provider's default unit (Kelvin)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Temperature {
    pub temp: f64,
    pub feels_like: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
}

/// Sunrise and sunset as unix timestamps (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: i64,
    pub sunset: i64,
}

/// Normalized current-weather record returned by every lookup.
///
/// Serializes to the nested shape
/// `{weather:{main,description}, temperature:{temp,feels_like}, visibility,
/// wind:{speed}, datetime, sys:{sunrise,sunset}, timezone, name}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherReport {
    pub weather: Conditions,
    pub temperature: Temperature,
    /// Visibility in meters
    pub visibility: i64,
    pub wind: Wind,
    /// Time of the observation, unix seconds (UTC)
    pub datetime: i64,
    pub sys: SunTimes,
    /// Shift in seconds from UTC
    pub timezone: i64,
    /// Place name as reported by the provider
    pub name: String,
}

impl WeatherReport {
    /// Render the report as a compact JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_shape() {
        let report = WeatherReport {
            weather: Conditions {
                main: "Clear".into(),
                description: "clear sky".into(),
            },
            temperature: Temperature {
                temp: 290.1,
                feels_like: 289.5,
            },
            visibility: 10000,
            wind: Wind { speed: 3.6 },
            datetime: 1_700_000_000,
            sys: SunTimes {
                sunrise: 1_699_990_000,
                sunset: 1_700_030_000,
            },
            timezone: 3600,
            name: "Paris".into(),
        };

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["weather"]["main"], "Clear");
        assert_eq!(value["weather"]["description"], "clear sky");
        assert_eq!(value["temperature"]["temp"], 290.1);
        assert_eq!(value["temperature"]["feels_like"], 289.5);
        assert_eq!(value["visibility"], 10000);
        assert_eq!(value["wind"]["speed"], 3.6);
        assert_eq!(value["datetime"], 1_700_000_000);
        assert_eq!(value["sys"]["sunrise"], 1_699_990_000);
        assert_eq!(value["sys"]["sunset"], 1_700_030_000);
        assert_eq!(value["timezone"], 3600);
        assert_eq!(value["name"], "Paris");
    }

    #[test]
    fn test_coordinates_display() {
        assert_eq!(Coordinates::new(48.85, 2.35).to_string(), "(48.85, 2.35)");
    }
}
