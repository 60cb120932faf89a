//! HTTP client for the pin service

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::pins::{NearbyPins, PinService};
use async_trait::async_trait;
use geoar_map::GeoFix;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConsumeRequest<'a> {
    location_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConsumeResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Pin service reached over HTTP
///
/// Endpoints are relative to the base URL:
/// - `GET /nearby-pins?lat=..&lng=..` returns [`NearbyPins`]
/// - `POST /consume` with `{"locationId": ..}` returns `{"success": .., "message": ..}`
pub struct HttpPinService {
    client: Client,
    base_url: String,
    timeout: Duration,
    token: Option<String>,
}

impl HttpPinService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(15),
            token: None,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        let service = Self::new(config.base_url.clone()).with_timeout(config.timeout);
        match &config.token {
            Some(token) => service.with_token(token.clone()),
            None => service,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send a bearer token with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ServiceError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.timeout(self.timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout(self.timeout)
            } else if e.is_connect() {
                ServiceError::Connection(format!("Failed to connect to {}", self.base_url))
            } else {
                ServiceError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(error = %e, "failed to read error response body");
                    String::new()
                }
            };
            warn!(status = status.as_u16(), "pin service returned an error");
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait(?Send)]
impl PinService for HttpPinService {
    async fn nearby_pins(&self, origin: GeoFix) -> Result<NearbyPins, ServiceError> {
        let url = format!("{}/nearby-pins", self.base_url);
        debug!(%url, lat = origin.lat(), lng = origin.lng(), "fetching nearby pins");

        let response = self
            .send(
                self.client
                    .get(&url)
                    .query(&[("lat", origin.lat()), ("lng", origin.lng())]),
            )
            .await?;

        response
            .json::<NearbyPins>()
            .await
            .map_err(|e| ServiceError::Parse(format!("Failed to parse nearby pins: {e}")))
    }

    async fn consume(&self, location_id: &str) -> Result<(), ServiceError> {
        let url = format!("{}/consume", self.base_url);
        debug!(%url, location_id, "consuming location");

        let response = self
            .send(self.client.post(&url).json(&ConsumeRequest { location_id }))
            .await?;

        let body = response
            .json::<ConsumeResponse>()
            .await
            .map_err(|e| ServiceError::Parse(format!("Failed to parse consume response: {e}")))?;

        if body.success {
            Ok(())
        } else {
            Err(ServiceError::Rejected(
                body.message
                    .unwrap_or_else(|| "The location could not be collected".to_string()),
            ))
        }
    }
}
