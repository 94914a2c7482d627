//! Weather service orchestration
//!
//! The single pipeline every request goes through:
//! `normalize → classify → lookup → (miss/stale) → fetch → write → return`.
//! A per-(regime, key) single-flight guard serializes racing callers so at
//! most one external fetch is in flight per key; the losers of the race
//! re-check the store and find the winner's record fresh.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::budget::RateBudget;
use crate::client::{Fetch, RawApiResponse};
use crate::config::WeatherConfig;
use crate::error::WeatherError;
use crate::forecast::{self, AggregateError, ForecastTable};
use crate::regime::{self, Regime};
use crate::store::{CacheRecord, StoreBackend, StoreError, TieredStore};
use crate::time::{self, TimeInput};

type FlightKey = (Regime, String);

/// The weather acquisition and caching service
pub struct WeatherService<F, S> {
    zone: Tz,
    fetcher: F,
    store: TieredStore<S>,
    inflight: Mutex<HashMap<FlightKey, Arc<Mutex<()>>>>,
}

impl<F: Fetch, S: StoreBackend> WeatherService<F, S> {
    /// Assembles the service from validated configuration, a fetch
    /// implementation, and a store backend.
    pub fn new(config: &WeatherConfig, fetcher: F, backend: S) -> Self {
        let budget = RateBudget::from_daily_quotas(
            config.budget.current_per_day,
            config.budget.forecast_per_day,
        );
        Self {
            zone: config.local_zone,
            fetcher,
            store: TieredStore::new(backend, budget),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Current conditions at the rig's coordinates.
    pub async fn current(&self) -> Result<RawApiResponse, WeatherError> {
        self.weather_at(TimeInput::Now).await
    }

    /// Weather at an arbitrary instant, cached per its regime.
    pub async fn weather_at(&self, input: TimeInput) -> Result<RawApiResponse, WeatherError> {
        self.lookup_or_fetch(input, Utc::now()).await
    }

    /// The hourly breakdown for a query, reshaped column-wise.
    ///
    /// Only the raw response is cached; the table is derived on demand.
    pub async fn hourly(&self, input: TimeInput) -> Result<ForecastTable, WeatherError> {
        let raw = self.weather_at(input).await?;
        let hourly = raw.hourly.as_ref().ok_or(AggregateError::NoHourlyData)?;
        Ok(forecast::aggregate(&hourly.data, &raw.timezone)?)
    }

    /// The pipeline proper. `now` is a parameter so freshness decisions are
    /// deterministic under test; the public methods pass the wall clock.
    pub(crate) async fn lookup_or_fetch(
        &self,
        input: TimeInput,
        now: DateTime<Utc>,
    ) -> Result<RawApiResponse, WeatherError> {
        let normalized = time::normalize(input, self.zone, now)?;
        let today = now.with_timezone(&self.zone).date_naive();
        let regime = regime::classify(normalized.explicit, normalized.day, today);
        let key = regime::cache_key(regime, normalized.day);

        let guard = self.flight_guard(regime, &key).await;
        let result = {
            let _held = guard.lock().await;
            self.resolve(regime, &key, normalized.explicit.then_some(normalized.instant), now)
                .await
        };
        drop(guard);
        self.drop_idle_guard(regime, &key).await;
        result
    }

    /// Check-fetch-write under the single-flight guard.
    async fn resolve(
        &self,
        regime: Regime,
        key: &str,
        instant: Option<DateTime<Tz>>,
        now: DateTime<Utc>,
    ) -> Result<RawApiResponse, WeatherError> {
        if let Some(record) = self.store.lookup(regime, key)? {
            if self.store.is_fresh(&record, regime, now) {
                debug!(%regime, key, "serving cached record");
                let raw = serde_json::from_value(record.payload).map_err(|source| {
                    StoreError::Corrupt {
                        key: key.to_string(),
                        source,
                    }
                })?;
                return Ok(raw);
            }
            debug!(%regime, key, "cached record is stale, refetching");
        } else {
            debug!(%regime, key, "no cached record");
        }

        let raw = self.fetcher.fetch(regime, instant).await?;

        // The write happens only after a complete, successfully parsed
        // response; an abandoned or failed fetch leaves the store untouched.
        let payload = serde_json::to_value(&raw).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        let record = CacheRecord {
            fetched_at: now,
            regime_key: key.to_string(),
            payload,
            timezone: raw.timezone.clone(),
        };
        self.store.write(regime, key, record)?;

        Ok(raw)
    }

    async fn flight_guard(&self, regime: Regime, key: &str) -> Arc<Mutex<()>> {
        let mut map = self.inflight.lock().await;
        map.entry((regime, key.to_string()))
            .or_default()
            .clone()
    }

    /// Drops a guard entry nobody holds, so the map does not accumulate one
    /// entry per date key over the rig's lifetime.
    async fn drop_idle_guard(&self, regime: Regime, key: &str) {
        let mut map = self.inflight.lock().await;
        let flight_key = (regime, key.to_string());
        if let Some(arc) = map.get(&flight_key) {
            if Arc::strong_count(arc) == 1 {
                map.remove(&flight_key);
            }
        }
    }
}
