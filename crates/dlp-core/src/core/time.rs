// crates/dlp-core/src/core/time.rs
// ============================================================================
// Module: DLP Watchdog Time Model
// Description: Wall-clock timestamp representation for registry, scan, and log records.
// Purpose: Provide a single ISO-8601 UTC millisecond timestamp type across the pipeline.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! Unlike a deterministic-replay core, the watchdog intercepts live traffic
//! and must stamp records with the wall-clock time the event actually
//! happened. [`Timestamp::now`] reads the system clock; everywhere else
//! timestamps flow through this type rather than raw `i64` millis so that
//! serialization and formatting stay consistent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// UTC timestamp with millisecond precision.
///
/// # Invariants
/// - The wrapped value is Unix epoch milliseconds, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let now = OffsetDateTime::now_utc();
        Self(now.unix_timestamp() * 1_000 + i64::from(now.millisecond()))
    }

    /// Wraps a raw Unix millisecond value.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the Unix millisecond value.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the duration in milliseconds from `self` to `other`, saturating at zero
    /// when `other` is earlier.
    #[must_use]
    pub fn elapsed_ms_until(self, other: Self) -> u64 {
        other.0.saturating_sub(self.0).max(0).unsigned_abs()
    }

    /// Formats the timestamp as RFC 3339 (ISO-8601) with millisecond precision.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying offset/date conversion fails, which
    /// can only happen for out-of-range millisecond values.
    pub fn to_rfc3339(self) -> Result<String, time::error::Format> {
        let seconds = self.0.div_euclid(1_000);
        let millis = self.0.rem_euclid(1_000);
        let base = OffsetDateTime::from_unix_timestamp(seconds)
            .map_err(|_| time::error::Format::InvalidComponent("out of range timestamp"))?;
        let nanos = u32::try_from(millis).unwrap_or(0) * 1_000_000;
        let stamped = base.replace_nanosecond(nanos).unwrap_or(base);
        stamped.format(&Rfc3339)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self(0)
    }
}

#[cfg(test)]
mod tests {
    use super::Timestamp;

    #[test]
    fn round_trips_raw_millis() {
        let t = Timestamp::from_unix_millis(1_700_000_000_123);
        assert_eq!(t.as_unix_millis(), 1_700_000_000_123);
    }

    #[test]
    fn elapsed_ms_until_is_nonnegative() {
        let a = Timestamp::from_unix_millis(1_000);
        let b = Timestamp::from_unix_millis(1_500);
        assert_eq!(a.elapsed_ms_until(b), 500);
        assert_eq!(b.elapsed_ms_until(a), 0);
    }

    #[test]
    fn formats_as_rfc3339() {
        let t = Timestamp::from_unix_millis(1_700_000_000_000);
        let formatted = t.to_rfc3339().expect("format");
        assert!(formatted.starts_with("2023-11-14"));
    }
}
