//! # Temporal Types: UTC Timestamps and Monotonic Clocks
//!
//! `Timestamp` is a UTC-only instant truncated to seconds. Phase deadlines
//! are stored as timestamps and compared against a [`Clock`].
//!
//! ## Security Invariant
//!
//! A clock handed to the phase controller never reports an earlier instant
//! than one it has already reported. Wall-clock adjustments therefore cannot
//! re-open a closed collection window.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string. Only the `Z` suffix is accepted.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if !s.ends_with('Z') {
            return Err(CoreError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            CoreError::InvalidTimestamp(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// From a Unix epoch timestamp in seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, CoreError> {
        let dt = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| CoreError::InvalidTimestamp(format!("invalid Unix timestamp: {secs}")))?;
        Ok(Self(dt))
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// The latest representable instant.
    pub fn latest() -> Self {
        Self(truncate_to_seconds(DateTime::<Utc>::MAX_UTC))
    }

    /// The earliest representable instant.
    pub fn earliest() -> Self {
        Self(truncate_to_seconds(DateTime::<Utc>::MIN_UTC))
    }

    /// This instant shifted by `secs` seconds, saturating at
    /// [`Self::latest`] and [`Self::earliest`].
    pub fn plus_secs(&self, secs: i64) -> Self {
        chrono::TimeDelta::try_seconds(secs)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Self)
            .unwrap_or_else(|| if secs >= 0 { Self::latest() } else { Self::earliest() })
    }

    /// Seconds from `self` until `later`. Zero if `later` is not after `self`.
    pub fn secs_until(&self, later: &Timestamp) -> u64 {
        let delta = later.epoch_secs().saturating_sub(self.epoch_secs());
        u64::try_from(delta).unwrap_or(0)
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

// ─── Clocks ──────────────────────────────────────────────────────────

/// A monotonic time source.
///
/// Implementations must never return an instant earlier than one they have
/// already returned.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time, clamped so it never moves backward.
#[derive(Debug, Default)]
pub struct SystemClock {
    high_water: AtomicI64,
}

impl SystemClock {
    /// Create a clock with no observations yet.
    pub fn new() -> Self {
        Self {
            high_water: AtomicI64::new(i64::MIN),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let observed = Timestamp::now();
        let secs = observed.epoch_secs();
        let previous = self.high_water.fetch_max(secs, Ordering::SeqCst);
        if previous > secs {
            Timestamp::from_epoch_secs(previous).unwrap_or(observed)
        } else {
            observed
        }
    }
}

/// A manually driven clock for tests and simulations.
///
/// Clones share the same underlying instant, so a test can keep one copy
/// and hand another to the vault.
#[derive(Debug, Clone)]
pub struct ManualClock {
    secs: Arc<AtomicI64>,
}

impl ManualClock {
    /// Start the clock at the given instant.
    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            secs: Arc::new(AtomicI64::new(start.epoch_secs())),
        }
    }

    /// Move time forward by `secs` seconds. Negative values are ignored.
    /// Saturates at [`Timestamp::latest`].
    pub fn advance(&self, secs: i64) {
        if secs <= 0 {
            return;
        }
        let ceiling = Timestamp::latest().epoch_secs();
        // The closure always returns Some, so the update cannot fail.
        let _ = self
            .secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                Some(cur.saturating_add(secs).min(ceiling))
            });
    }

    /// Jump to `to` if it is not earlier than the current instant.
    /// Returns whether the clock moved.
    pub fn set(&self, to: Timestamp) -> bool {
        let target = to.epoch_secs();
        self.secs.fetch_max(target, Ordering::SeqCst) <= target
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let secs = self.secs.load(Ordering::SeqCst);
        // Starts from a valid timestamp and only moves forward up to `latest`.
        Timestamp::from_epoch_secs(secs).unwrap_or_else(|_| Timestamp::latest())
    }
}
