//! Driver-list REST client
//!
//! Thin proxy client for the external `GET /drivers` endpoint. A non-2xx
//! upstream response is a hard failure surfaced to the caller; nothing is
//! cached or retried here.

use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "dispatch-hub/0.1.0 (ride-dispatch dashboard)";

/// Driver-list client errors
#[derive(Debug, Error)]
pub enum DriversError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Driver endpoint returned {0}: {1}")]
    Upstream(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Client for the external driver-list endpoint
pub struct DriversClient {
    http_client: reqwest::Client,
    url: String,
}

impl DriversClient {
    pub fn new(url: &str) -> Result<Self, DriversError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DriversError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.to_string(),
        })
    }

    /// Fetch the driver records, passing the upstream JSON through as-is
    pub async fn fetch(&self) -> Result<serde_json::Value, DriversError> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DriversError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriversError::Upstream(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| DriversError::Parse(e.to_string()))
    }
}
