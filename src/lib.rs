//! grillwx — weather acquisition and tiered caching for the grill rig
//!
//! Classifies a requested moment into one of three temporal regimes
//! (current conditions, forecast, historical record), enforces a per-regime
//! daily request budget against the metered weather API by deriving a TTL,
//! and persists raw responses with regime-specific write semantics: the
//! current slot is overwritten, forecast days are superseded intraday, and
//! historical days are written once and kept forever.

pub mod budget;
pub mod client;
pub mod config;
pub mod error;
pub mod forecast;
pub mod regime;
pub mod service;
pub mod store;
pub mod time;

pub use client::{DarkSkyClient, Fetch, RawApiResponse};
pub use config::{BudgetConfig, WeatherConfig};
pub use error::WeatherError;
pub use forecast::ForecastTable;
pub use regime::Regime;
pub use service::WeatherService;
pub use store::{CacheRecord, FileStore, MemoryStore, StoreBackend};
pub use time::TimeInput;
