//! Message timestamps.
//!
//! [`Stamp::ZERO`] (the Unix epoch) is a sentinel: a transform stamped with
//! it is *static*, i.e. valid at all times.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point in time attached to a joint-state batch or a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stamp(DateTime<Utc>);

impl Stamp {
    /// The zero sentinel.
    pub const ZERO: Stamp = Stamp(DateTime::<Utc>::UNIX_EPOCH);

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Stamp `nanos` nanoseconds after the epoch.
    pub fn from_nanos(nanos: i64) -> Self {
        Self(DateTime::from_timestamp_nanos(nanos))
    }

    /// Stamp `secs` seconds after the epoch.  Sub-nanosecond precision is
    /// truncated.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::from_nanos((secs * 1e9) as i64)
    }

    /// Stamp from the `sec` / `nanosec` pair used on the wire.  `None` when
    /// the pair is out of range (e.g. `nanosec` of two seconds or more).
    pub fn from_sec_nanosec(sec: i64, nanosec: u32) -> Option<Self> {
        DateTime::from_timestamp(sec, nanosec).map(Self)
    }

    /// `true` for the static-transform sentinel.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Seconds since the epoch.
    pub fn as_secs_f64(&self) -> f64 {
        self.0.timestamp() as f64 + f64::from(self.0.timestamp_subsec_nanos()) * 1e-9
    }

    /// Signed number of seconds from `earlier` to `self`.
    pub fn seconds_since(&self, earlier: Stamp) -> f64 {
        self.as_secs_f64() - earlier.as_secs_f64()
    }
}

impl Default for Stamp {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<DateTime<Utc>> for Stamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9}", self.as_secs_f64())
    }
}
