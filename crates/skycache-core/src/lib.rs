pub mod config;
pub mod error;

pub use config::{
    CacheConfig, Config, ConfigValidationError, OpenWeatherConfig, RefreshMode, ValidationResult,
};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging for a skycache host process.
///
/// Reads the filter from `RUST_LOG`, defaulting to `info`. Installing a
/// subscriber twice is not an error; the first one wins.
pub fn init() -> Result<()> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("skycache core initialized");
    } else {
        tracing::debug!("tracing subscriber already installed, keeping it");
    }
    Ok(())
}
