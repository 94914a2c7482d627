//! Service configuration
//!
//! All required values are validated once, at construction, and the config
//! is immutable afterwards. Missing or malformed values are a
//! `ConfigError` up front, never a deferred failure on first use.

use chrono_tz::Tz;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default caller-supplied timeout for the external fetch
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while constructing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was absent
    #[error("no value specified for environment variable: {0}")]
    MissingVar(&'static str),

    /// A supplied value failed to parse or validate
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Daily request quotas for the metered regimes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetConfig {
    /// Maximum CURRENT-regime requests per day
    pub current_per_day: f64,
    /// Maximum FORECAST-regime requests per day
    pub forecast_per_day: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        // The rig's original five-minute re-fetch window
        Self {
            current_per_day: 288.0,
            forecast_per_day: 288.0,
        }
    }
}

/// Immutable configuration for the weather service
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// Dark Sky style API key
    pub api_key: String,
    /// Latitude of the rig
    pub latitude: f64,
    /// Longitude of the rig
    pub longitude: f64,
    /// The caller's local zone, used for day classification
    pub local_zone: Tz,
    /// Timeout applied to each external fetch
    pub fetch_timeout: Duration,
    /// Daily request quotas
    pub budget: BudgetConfig,
}

impl WeatherConfig {
    /// Builds a validated configuration from explicit values.
    pub fn new(
        api_key: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            api_key: api_key.into(),
            latitude,
            longitude,
            local_zone: Tz::UTC,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            budget: BudgetConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the local zone used for regime classification.
    pub fn with_zone(mut self, zone: Tz) -> Self {
        self.local_zone = zone;
        self
    }

    /// Sets the external fetch timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Sets the daily request quotas. Re-validates because quotas must stay
    /// positive for the TTL derivation to be meaningful.
    pub fn with_budget(mut self, budget: BudgetConfig) -> Result<Self, ConfigError> {
        self.budget = budget;
        self.validate()?;
        Ok(self)
    }

    /// Loads configuration from the process environment.
    ///
    /// Required: `DARKSKY_KEY`, `LATITUDE`, `LONGITUDE`.
    /// Optional: `LOCAL_TIMEZONE` (IANA name, defaults to UTC).
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = require_var("DARKSKY_KEY")?;
        let latitude = parse_var("LATITUDE", &require_var("LATITUDE")?)?;
        let longitude = parse_var("LONGITUDE", &require_var("LONGITUDE")?)?;

        let mut config = Self::new(api_key, latitude, longitude)?;

        if let Ok(name) = env::var("LOCAL_TIMEZONE") {
            let zone: Tz = name.parse().map_err(|_| ConfigError::InvalidValue {
                name: "LOCAL_TIMEZONE",
                reason: format!("unknown timezone name '{}'", name),
            })?;
            config = config.with_zone(zone);
        }

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "api_key",
                reason: "must not be empty".to_string(),
            });
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ConfigError::InvalidValue {
                name: "latitude",
                reason: format!("{} outside [-90, 90]", self.latitude),
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ConfigError::InvalidValue {
                name: "longitude",
                reason: format!("{} outside [-180, 180]", self.longitude),
            });
        }
        if self.budget.current_per_day <= 0.0 || !self.budget.current_per_day.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "budget.current_per_day",
                reason: "must be a positive finite number".to_string(),
            });
        }
        if self.budget.forecast_per_day <= 0.0 || !self.budget.forecast_per_day.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "budget.forecast_per_day",
                reason: "must be a positive finite number".to_string(),
            });
        }
        Ok(())
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn parse_var(name: &'static str, value: &str) -> Result<f64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        name,
        reason: format!("'{}' is not a number", value),
    })
}
