//! Top-level error type for the service path
//!
//! Each module defines its own error next to the code that raises it; this
//! enum funnels them for callers of [`crate::service::WeatherService`].
//! Nothing here is swallowed or substituted: every failure reaches the
//! caller typed, with enough context to decide on a retry.

use thiserror::Error;

use crate::client::FetchError;
use crate::config::ConfigError;
use crate::forecast::AggregateError;
use crate::store::StoreError;
use crate::time::ValidationError;

/// Any failure of a weather service operation
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Missing or invalid configuration; fatal at construction
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The caller's time input was invalid
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The external fetch failed (HTTP status, transport, or parse)
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The persistence collaborator failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Hourly data could not be reshaped
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}
