//! Hourly forecast aggregation
//!
//! The API's `hourly.data` array is a list of per-hour objects whose fields
//! drift: a field present in hour 3 may be absent in hour 5. The aggregator
//! reshapes the array into a column-oriented table over the union of field
//! names, null-filling the gaps, and converts the `time` column to
//! timezone-aware instants in the zone the response itself declares. That
//! zone can differ from the caller's local zone when the queried
//! coordinates sit elsewhere.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors while reshaping hourly data
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The response declared a timezone name chrono-tz does not know
    #[error("unknown timezone name in response: '{0}'")]
    UnknownTimezone(String),

    /// An hourly entry lacked the required `time` field
    #[error("hourly entry {index} has no 'time' field")]
    MissingTime { index: usize },

    /// An hourly entry's `time` was not a valid UNIX timestamp
    #[error("hourly entry {index} has an invalid 'time' value")]
    InvalidTime { index: usize },

    /// The response carried no hourly block at all
    #[error("response contains no hourly data")]
    NoHourlyData,
}

/// Column-oriented view of hourly forecast data.
///
/// `columns` maps every field name seen across the hours to one value per
/// hour, `Value::Null` where that hour lacked the field (the raw `time`
/// values included). `times` holds the `time` column converted to instants
/// in the response's declared zone, index-aligned with the columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastTable {
    pub times: Vec<DateTime<Tz>>,
    pub columns: BTreeMap<String, Vec<Value>>,
}

impl ForecastTable {
    /// Number of hours in the table.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The values of one column, if that field appeared in any hour.
    pub fn column(&self, field: &str) -> Option<&[Value]> {
        self.columns.get(field).map(Vec::as_slice)
    }

    /// All field names, sorted.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Reshapes per-hour records into a [`ForecastTable`].
///
/// The field-name union is computed up front over all entries, so a field's
/// column always has exactly one value per hour. Hours missing a field get
/// an explicit null; neither the hour nor the field is dropped.
pub fn aggregate(
    hours: &[serde_json::Map<String, Value>],
    timezone_name: &str,
) -> Result<ForecastTable, AggregateError> {
    let zone: Tz = timezone_name
        .parse()
        .map_err(|_| AggregateError::UnknownTimezone(timezone_name.to_string()))?;

    let fields: BTreeSet<&str> = hours
        .iter()
        .flat_map(|hour| hour.keys().map(String::as_str))
        .collect();

    let mut columns: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for field in &fields {
        let column = hours
            .iter()
            .map(|hour| hour.get(*field).cloned().unwrap_or(Value::Null))
            .collect();
        columns.insert((*field).to_string(), column);
    }

    let mut times = Vec::with_capacity(hours.len());
    for (index, hour) in hours.iter().enumerate() {
        let seconds = hour
            .get("time")
            .ok_or(AggregateError::MissingTime { index })?
            .as_i64()
            .ok_or(AggregateError::InvalidTime { index })?;
        let instant = Utc
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or(AggregateError::InvalidTime { index })?;
        times.push(instant.with_timezone(&zone));
    }

    Ok(ForecastTable { times, columns })
}
