//! Shared plumbing for the OpenWeather boundary clients.

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use skycache_core::{NetworkError, OpenWeatherConfig, ReqwestErrorExt};

/// Build the HTTP client used by both the geocoder and the weather provider.
pub(crate) fn build_client(config: &OpenWeatherConfig) -> Result<Client, NetworkError> {
    Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| e.without_url().into_network_error())
}

/// Send a GET request and decode a JSON body.
///
/// Request URLs carry the API key, so reqwest errors are stripped of their URL
/// before they are surfaced.
pub(crate) async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, NetworkError> {
    let response = request
        .send()
        .await
        .map_err(|e| e.without_url().into_network_error())?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        tracing::debug!("OpenWeather returned status {}", status);
        return Err(NetworkError::ServerError {
            status: status.as_u16(),
            message,
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| e.without_url().into_network_error())?;

    serde_json::from_slice(&body).map_err(|e| {
        NetworkError::InvalidResponse(format!(
            "{}: {}",
            e,
            String::from_utf8_lossy(&body)
        ))
    })
}
