//! Weather cache error types.

use skycache_core::{AppError, NetworkError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    /// Caller passed an unusable argument (empty city name, empty key).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The cache was deactivated; a new one must be requested.
    #[error("Cache has been deactivated")]
    StaleHandle,

    #[error("Could not resolve coordinates for {city}: {source}")]
    LookupFailed {
        city: String,
        #[source]
        source: NetworkError,
    },

    #[error("Could not fetch weather at ({latitude}, {longitude}): {source}")]
    FetchFailed {
        latitude: f64,
        longitude: f64,
        #[source]
        source: NetworkError,
    },

    /// The HTTP client for the remote provider could not be built.
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(#[source] NetworkError),

    /// A background refresh cycle failed and took the cache down with it.
    #[error("Background refresh failed: {0}")]
    BackgroundTaskFailure(#[source] Box<WeatherError>),
}

impl WeatherError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidArgument(msg) => format!("Invalid request: {}", msg),
            Self::StaleHandle => "This weather session has ended. Please start a new one.".to_string(),
            Self::LookupFailed { city, .. } => format!("Could not find \"{}\".", city),
            Self::FetchFailed { source, .. } => source.user_message().to_string(),
            Self::ClientSetup(_) => "Weather service could not start. Please try again.".to_string(),
            Self::BackgroundTaskFailure(_) => {
                "Automatic weather updates stopped. Please start a new session.".to_string()
            }
        }
    }

    /// Whether the same lookup may succeed if simply tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LookupFailed { .. } | Self::FetchFailed { .. })
    }

    /// Whether the caller has to obtain a fresh cache before trying again.
    pub fn requires_new_handle(&self) -> bool {
        matches!(self, Self::StaleHandle | Self::BackgroundTaskFailure(_))
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::LookupFailed { source, .. } | WeatherError::FetchFailed { source, .. } => {
                AppError::Network(source)
            }
            other => AppError::Service(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_failed() -> WeatherError {
        WeatherError::FetchFailed {
            latitude: 48.85,
            longitude: 2.35,
            source: NetworkError::Timeout,
        }
    }

    #[test]
    fn test_error_user_messages() {
        let err = WeatherError::LookupFailed {
            city: "Atlantis".into(),
            source: NetworkError::NotFound("Atlantis".into()),
        };
        assert!(err.user_message().contains("Atlantis"));

        assert!(WeatherError::StaleHandle.user_message().contains("new one"));
        assert!(fetch_failed().user_message().contains("timed out"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(fetch_failed().is_retryable());
        assert!(!WeatherError::StaleHandle.is_retryable());
        assert!(!WeatherError::invalid("empty city name").is_retryable());
    }

    #[test]
    fn test_requires_new_handle() {
        assert!(WeatherError::StaleHandle.requires_new_handle());
        assert!(WeatherError::BackgroundTaskFailure(Box::new(fetch_failed())).requires_new_handle());
        assert!(!fetch_failed().requires_new_handle());
    }

    #[test]
    fn test_source_chain_is_kept() {
        let err = WeatherError::BackgroundTaskFailure(Box::new(fetch_failed()));
        let inner = std::error::Error::source(&err).unwrap();
        assert!(inner.to_string().contains("48.85"));
        assert!(std::error::Error::source(inner).is_some());
    }

    #[test]
    fn test_app_error_mapping() {
        let app: AppError = fetch_failed().into();
        assert!(matches!(app, AppError::Network(NetworkError::Timeout)));

        let app: AppError = WeatherError::StaleHandle.into();
        assert!(matches!(app, AppError::Service(_)));
    }
}
