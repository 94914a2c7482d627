//! External weather API client
//!
//! Builds the outbound Dark Sky style request and parses its JSON response.
//! CURRENT requests carry coordinates only; FORECAST and HISTORICAL both use
//! the time-machine request shape with the instant rendered in the local
//! zone — the two regimes are fetched identically and differ only in how
//! the result is cached. The client never retries: transport and HTTP
//! failures are surfaced for the caller to decide.

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, WeatherConfig};
use crate::regime::Regime;

/// Base URL for the weather API
const DARKSKY_BASE_URL: &str = "https://api.darksky.net/forecast";

/// Instant rendering for time-machine requests
const TIME_MACHINE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Errors from the external fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API responded with a non-success HTTP status
    #[error("weather API returned HTTP {0}")]
    Status(u16),

    /// Network-level failure: DNS, timeout, connection refused
    #[error("transport failure reaching weather API: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the expected JSON document
    #[error("malformed weather API response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The external API's JSON document for a single call.
///
/// Only the fields the core needs are typed; everything else rides along in
/// `extra` so the cached document round-trips byte-for-byte in content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawApiResponse {
    /// Conditions at the requested instant
    pub currently: Value,
    /// Per-hour records, when the API includes them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly: Option<HourlyBlock>,
    /// IANA timezone name of the queried coordinates
    pub timezone: String,
    /// All remaining top-level fields, preserved as-is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// The `hourly` block of a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyBlock {
    /// One object per hour; hours are not guaranteed homogeneous
    pub data: Vec<serde_json::Map<String, Value>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RawApiResponse {
    /// UNIX timestamp of the `currently` observation, if present.
    pub fn observed_unix_time(&self) -> Option<i64> {
        self.currently.get("time").and_then(Value::as_i64)
    }

    /// Temperature of the `currently` observation, if present.
    pub fn temperature(&self) -> Option<f64> {
        self.currently.get("temperature").and_then(Value::as_f64)
    }
}

/// The fetch seam between the service and the network.
///
/// `instant` is absent for CURRENT and carries the normalized local-zone
/// instant for the dated regimes.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(
        &self,
        regime: Regime,
        instant: Option<DateTime<Tz>>,
    ) -> Result<RawApiResponse, FetchError>;
}

#[async_trait]
impl<F: Fetch + ?Sized> Fetch for std::sync::Arc<F> {
    async fn fetch(
        &self,
        regime: Regime,
        instant: Option<DateTime<Tz>>,
    ) -> Result<RawApiResponse, FetchError> {
        (**self).fetch(regime, instant).await
    }
}

/// Dark Sky style HTTP client
#[derive(Debug, Clone)]
pub struct DarkSkyClient {
    http: Client,
    base_url: String,
    api_key: String,
    latitude: f64,
    longitude: f64,
}

impl DarkSkyClient {
    /// Builds a client from validated configuration; the configured fetch
    /// timeout is installed on the underlying HTTP client.
    pub fn new(config: &WeatherConfig) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|err| ConfigError::InvalidValue {
                name: "fetch_timeout",
                reason: err.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: DARKSKY_BASE_URL.to_string(),
            api_key: config.api_key.clone(),
            latitude: config.latitude,
            longitude: config.longitude,
        })
    }

    /// Overrides the API base URL (self-hosted mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `{base}/{key}/{lat},{lon}/` for current conditions, with the
    /// ISO-rendered instant appended for time-machine requests.
    fn request_url(&self, instant: Option<&DateTime<Tz>>) -> String {
        match instant {
            None => format!(
                "{}/{}/{},{}/",
                self.base_url, self.api_key, self.latitude, self.longitude
            ),
            Some(t) => format!(
                "{}/{}/{},{},{}/",
                self.base_url,
                self.api_key,
                self.latitude,
                self.longitude,
                t.format(TIME_MACHINE_FORMAT)
            ),
        }
    }
}

#[async_trait]
impl Fetch for DarkSkyClient {
    async fn fetch(
        &self,
        regime: Regime,
        instant: Option<DateTime<Tz>>,
    ) -> Result<RawApiResponse, FetchError> {
        let url = self.request_url(instant.as_ref());

        // The URL embeds the API key, so it stays out of the log line
        info!(%regime, instant = ?instant, "sending weather request to the API");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            // No partial parsing of error bodies; the status is the failure
            return Err(FetchError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let parsed: RawApiResponse = serde_json::from_str(&text)?;
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    /// Trimmed Dark Sky style response
    const SAMPLE_RESPONSE: &str = r#"{
        "latitude": 43.6532,
        "longitude": -79.3832,
        "timezone": "America/Toronto",
        "offset": -5,
        "currently": {
            "time": 1710075600,
            "summary": "Partly Cloudy",
            "temperature": 4.2,
            "humidity": 0.71
        },
        "hourly": {
            "summary": "Cloudy through the evening.",
            "data": [
                {"time": 1710072000, "temperature": 3.8},
                {"time": 1710075600, "temperature": 4.2, "humidity": 0.71}
            ]
        }
    }"#;

    fn client() -> DarkSkyClient {
        let config = WeatherConfig::new("secret", 43.6532, -79.3832).unwrap();
        DarkSkyClient::new(&config).unwrap()
    }

    #[test]
    fn test_current_url_has_no_instant() {
        let url = client().request_url(None);
        assert_eq!(
            url,
            "https://api.darksky.net/forecast/secret/43.6532,-79.3832/"
        );
    }

    #[test]
    fn test_time_machine_url_renders_local_offset() {
        let instant = New_York.with_ymd_and_hms(2024, 3, 9, 23, 0, 0).unwrap();
        let url = client().request_url(Some(&instant));
        assert_eq!(
            url,
            "https://api.darksky.net/forecast/secret/43.6532,-79.3832,2024-03-09T23:00:00-05:00/"
        );
    }

    #[test]
    fn test_with_base_url() {
        let instant_free = client()
            .with_base_url("http://localhost:9999")
            .request_url(None);
        assert!(instant_free.starts_with("http://localhost:9999/secret/"));
    }

    #[test]
    fn test_parse_sample_response() {
        let parsed: RawApiResponse = serde_json::from_str(SAMPLE_RESPONSE).unwrap();
        assert_eq!(parsed.timezone, "America/Toronto");
        assert_eq!(parsed.observed_unix_time(), Some(1710075600));
        assert!((parsed.temperature().unwrap() - 4.2).abs() < 1e-9);
        assert_eq!(parsed.hourly.as_ref().unwrap().data.len(), 2);
        // Unknown top-level fields survive
        assert!(parsed.extra.contains_key("latitude"));
        assert!(parsed.extra.contains_key("offset"));
    }

    #[test]
    fn test_response_roundtrips_through_json() {
        let parsed: RawApiResponse = serde_json::from_str(SAMPLE_RESPONSE).unwrap();
        let rewritten = serde_json::to_value(&parsed).unwrap();
        let reparsed: RawApiResponse = serde_json::from_value(rewritten).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn test_response_without_hourly_block() {
        let body = r#"{
            "timezone": "America/Toronto",
            "currently": {"time": 1710075600, "temperature": 4.2}
        }"#;
        let parsed: RawApiResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.hourly.is_none());
    }

    #[test]
    fn test_missing_currently_is_a_parse_error() {
        let body = r#"{"timezone": "America/Toronto"}"#;
        let result: Result<RawApiResponse, _> = serde_json::from_str(body);
        assert!(result.is_err());
    }
}
