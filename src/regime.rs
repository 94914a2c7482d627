//! Temporal regime classification
//!
//! Every weather query falls into one of three regimes relative to "now":
//! current conditions, a forecast for today or a future day, or a historical
//! record for a completed past day. The regime decides which cache partition
//! is consulted and which write policy applies.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed cache key for the single CURRENT slot
pub const CURRENT_SLOT: &str = "current";

/// Temporal regime of a weather query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    /// Conditions right now; one cache slot, always overwritten
    Current,
    /// Today or a future day; cached per date, superseded intraday
    Forecast,
    /// A completed past day; cached per date, written once
    Historical,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Current => write!(f, "current"),
            Regime::Forecast => write!(f, "forecast"),
            Regime::Historical => write!(f, "historical"),
        }
    }
}

/// Classifies a query day against the caller's local calendar day.
///
/// `had_instant` is whether the caller supplied an instant at all; a query
/// with no instant is CURRENT regardless of dates. Equality resolves to
/// FORECAST: today's data keeps updating until the day is complete, and the
/// HISTORICAL partition's write-once policy would freeze it prematurely.
pub fn classify(had_instant: bool, day: NaiveDate, today: NaiveDate) -> Regime {
    if !had_instant {
        Regime::Current
    } else if day >= today {
        Regime::Forecast
    } else {
        Regime::Historical
    }
}

/// Returns the cache key for a query in the given regime.
///
/// CURRENT uses the fixed single-slot key; the dated regimes key by ISO
/// calendar date.
pub fn cache_key(regime: Regime, day: NaiveDate) -> String {
    match regime {
        Regime::Current => CURRENT_SLOT.to_string(),
        Regime::Forecast | Regime::Historical => day.format("%Y-%m-%d").to_string(),
    }
}
