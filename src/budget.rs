//! Request budget to TTL derivation
//!
//! The external API meters calls per day. Rather than counting calls, the
//! budget is expressed as a minimum re-fetch interval: a regime allowed
//! `max_requests_per_day` calls gets a TTL of `86400 / max_requests_per_day`
//! seconds, and a cached record younger than that is served without a fetch.

use crate::regime::Regime;
use std::time::Duration;

/// Seconds in a day; the numerator of every TTL derivation
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Per-regime time-to-live policy derived from daily request quotas.
///
/// Immutable after construction. HISTORICAL carries no TTL at all: a past
/// day's record is authoritative forever, so staleness never applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateBudget {
    current_ttl: Duration,
    forecast_ttl: Duration,
}

impl RateBudget {
    /// Derives TTLs from daily quotas. Quotas must be positive; validation
    /// happens at config construction, so this takes them as given.
    pub fn from_daily_quotas(current_per_day: f64, forecast_per_day: f64) -> Self {
        Self {
            current_ttl: Duration::from_secs_f64(SECONDS_PER_DAY / current_per_day),
            forecast_ttl: Duration::from_secs_f64(SECONDS_PER_DAY / forecast_per_day),
        }
    }

    /// Returns the TTL for a regime, or `None` for HISTORICAL (no expiry).
    pub fn ttl(&self, regime: Regime) -> Option<Duration> {
        match regime {
            Regime::Current => Some(self.current_ttl),
            Regime::Forecast => Some(self.forecast_ttl),
            Regime::Historical => None,
        }
    }
}

impl Default for RateBudget {
    /// 288 requests/day for both metered regimes, matching the rig's
    /// original five-minute re-fetch window.
    fn default() -> Self {
        Self::from_daily_quotas(288.0, 288.0)
    }
}
