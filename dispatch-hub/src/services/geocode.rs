//! Forward geocoding client (Nominatim-style search API)
//!
//! Resolves free-text queries to ranked candidate locations, restricted
//! to a single configured country. Responses cap at the configured limit
//! (top 5 by default). Requests are rate-limited to one per second per
//! the public Nominatim usage policy; a request whose caller goes away is
//! simply dropped mid-flight along with the handler future.

use dispatch_common::config::GeocodeConfig;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const USER_AGENT: &str = "dispatch-hub/0.1.0 (ride-dispatch dashboard)";
const RATE_LIMIT_MS: u64 = 1000; // 1 request per second

/// Geocoding client errors
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Geocoder returned {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One ranked geocoding candidate.
///
/// Nominatim serializes coordinates as strings; they are passed through
/// untouched for the presentation layer to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub display_name: String,
    pub lat: String,
    pub lon: String,
}

/// Rate limiter enforcing one request per second
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with the rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting geocode request: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Forward geocoding client
pub struct GeocodeClient {
    http_client: reqwest::Client,
    base_url: String,
    country_codes: String,
    limit: String,
    rate_limiter: RateLimiter,
}

impl GeocodeClient {
    pub fn new(config: &GeocodeConfig) -> Result<Self, GeocodeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
            country_codes: config.country_codes.clone(),
            limit: config.limit.to_string(),
            rate_limiter: RateLimiter::new(RATE_LIMIT_MS),
        })
    }

    /// Search for candidate locations matching `query`
    pub async fn search(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
        self.rate_limiter.wait().await;

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("format", "json"),
                ("q", query),
                ("countrycodes", self.country_codes.as_str()),
                ("limit", self.limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Api(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_parse_nominatim_string_coordinates() {
        let body = r#"[
            {"display_name":"Hoan Kiem Lake, Hanoi","lat":"21.0287","lon":"105.8524"},
            {"display_name":"Hoan Kiem District, Hanoi","lat":"21.0245","lon":"105.8412"}
        ]"#;

        let results: Vec<GeocodeResult> = serde_json::from_str(body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].lat, "21.0287");
        assert!(results[0].display_name.starts_with("Hoan Kiem Lake"));
    }

    #[tokio::test]
    async fn rate_limiter_spaces_out_consecutive_calls() {
        let limiter = RateLimiter::new(50);

        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;

        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
