//! Query time normalization
//!
//! Converts the caller's time input into a canonical timezone-aware instant
//! in the configured local zone, plus the local calendar day used for regime
//! classification. A timestamp without offset information is rejected: the
//! rig has been bitten by guessed zones before, so naive inputs are invalid,
//! never assumed.

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// The caller's time input for a weather query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInput {
    /// No instant supplied: current conditions
    Now,
    /// A calendar date; resolved to local midnight of that date
    Date(NaiveDate),
    /// A full instant carrying an explicit UTC offset
    Instant(DateTime<FixedOffset>),
}

/// A query time resolved into the local zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedTime {
    /// The canonical instant in the local zone
    pub instant: DateTime<Tz>,
    /// The instant's calendar day in the local zone
    pub day: NaiveDate,
    /// Whether the caller supplied an instant at all
    pub explicit: bool,
}

/// Errors for invalid query time input
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The input carried a time of day but no UTC offset
    #[error("naive timestamp not accepted: '{0}' carries no timezone offset")]
    NaiveTimestamp(String),

    /// The input string matched no accepted format
    #[error("unrecognized time input: '{0}' (expected RFC 3339 with offset, or YYYY-MM-DD)")]
    UnrecognizedInput(String),

    /// Local midnight of the date does not exist in the local zone (DST gap)
    #[error("local midnight of {date} does not exist in zone {zone}")]
    NonexistentLocalTime { date: NaiveDate, zone: Tz },
}

impl TimeInput {
    /// Parses a time input string.
    ///
    /// Accepts an RFC 3339 instant with an explicit offset, or a bare
    /// calendar date (`YYYY-MM-DD`). A datetime string lacking an offset is
    /// a `ValidationError::NaiveTimestamp`, not silently localized.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
            return Ok(TimeInput::Instant(instant));
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(TimeInput::Date(date));
        }
        // Distinguish a naive datetime (rejectable with a pointed message)
        // from garbage input.
        if chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
            || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
            || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").is_ok()
            || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").is_ok()
        {
            return Err(ValidationError::NaiveTimestamp(s.to_string()));
        }
        Err(ValidationError::UnrecognizedInput(s.to_string()))
    }
}

/// Resolves a time input against the local zone and the current instant.
///
/// Pure over (input, zone, now); `now` is passed in rather than read from
/// the clock so the pipeline stays deterministic under test.
pub fn normalize(
    input: TimeInput,
    zone: Tz,
    now: DateTime<Utc>,
) -> Result<NormalizedTime, ValidationError> {
    let (instant, explicit) = match input {
        TimeInput::Now => (now.with_timezone(&zone), false),
        TimeInput::Instant(dt) => (dt.with_timezone(&zone), true),
        TimeInput::Date(date) => {
            let midnight = date.and_hms_opt(0, 0, 0).ok_or(
                // Unreachable for 00:00:00, kept as an error rather than a panic
                ValidationError::NonexistentLocalTime { date, zone },
            )?;
            let local = match zone.from_local_datetime(&midnight) {
                LocalResult::Single(dt) => dt,
                // Fall-back transition: midnight occurs twice, take the earlier
                LocalResult::Ambiguous(earlier, _) => earlier,
                // Spring-forward gap swallowed midnight (e.g. America/Sao_Paulo)
                LocalResult::None => {
                    return Err(ValidationError::NonexistentLocalTime { date, zone })
                }
            };
            (local, true)
        }
    };

    Ok(NormalizedTime {
        instant,
        day: instant.date_naive(),
        explicit,
    })
}
