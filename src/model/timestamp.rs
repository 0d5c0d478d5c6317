//! Timestamps and clocks
//!
//! Timestamps carry millisecond precision and always render in the fixed
//! width form `YYYY-MM-DDTHH:MM:SS.sssZ`, so lexical order of the rendered
//! strings matches chronological order in the search store.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// UTC instant with millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current wall-clock time, truncated to milliseconds
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(3))
    }

    /// Build from milliseconds since the unix epoch
    pub fn from_millis(ms: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(ms).map(Self)
    }

    /// Parse an RFC 3339 / ISO-8601 string
    pub fn parse(value: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| Self(dt.with_timezone(&Utc).trunc_subsecs(3)))
            .map_err(|e| Error::validation(format!("invalid timestamp {:?}: {}", value, e)))
    }

    /// Milliseconds since the unix epoch
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// This instant shifted by `ms` milliseconds
    pub fn plus_millis(&self, ms: i64) -> Self {
        Self(self.0 + chrono::Duration::milliseconds(ms))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Source of mutation timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock that never hands out the same instant twice
///
/// When two calls land in the same millisecond the second one is pushed
/// forward by one millisecond.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Mutex<Option<Timestamp>>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let mut last = self.last.lock();
        let wall = Timestamp::now();
        let next = match *last {
            Some(previous) if wall <= previous => previous.plus_millis(1),
            _ => wall,
        };
        *last = Some(next);
        next
    }
}

/// Deterministic clock advancing by a fixed step on every call
#[derive(Debug)]
pub struct ManualClock {
    next_ms: AtomicI64,
    step_ms: i64,
}

impl ManualClock {
    /// Start at `start` and advance `step_ms` per call
    pub fn new(start: Timestamp, step_ms: i64) -> Self {
        Self {
            next_ms: AtomicI64::new(start.as_millis()),
            step_ms,
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let ms = self.next_ms.fetch_add(self.step_ms, Ordering::SeqCst);
        Timestamp::from_millis(ms).unwrap_or_else(Timestamp::now)
    }
}
