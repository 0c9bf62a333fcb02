//! Time management for the sampling agent
//!
//! Provides a clock abstraction so records and the display can be driven by
//! the system clock in production and by a fixed instant in tests:
//! - System clock (UTC for records, local zone for the display)
//! - Fixed clock (deterministic tests)

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, SubsecRound, Utc};

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Current instant in UTC
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current local wall-clock time, for human-facing output
    fn now_local(&self) -> NaiveDateTime;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_utc(&self) -> DateTime<Utc> {
        (**self).now_utc()
    }

    fn now_local(&self) -> NaiveDateTime {
        (**self).now_local()
    }
}

/// System time source
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Fixed time source for testing
///
/// Local time is reported as the UTC wall clock.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }

    /// Fixed clock at `secs` seconds since the Unix epoch
    pub fn from_unix(secs: i64) -> Self {
        Self::new(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.instant
    }

    fn now_local(&self) -> NaiveDateTime {
        self.instant.naive_utc()
    }
}

/// Drop sub-second precision from an instant
pub fn truncate_to_seconds(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(0)
}
