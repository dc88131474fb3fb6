//! Freshness rule for cached snapshots: a snapshot is valid for a number of
//! calendar days after it was taken, counted on a chosen wall clock.

use chrono::{DateTime, Days, FixedOffset, Local, Offset, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Default freshness window, in calendar days.
pub const DEFAULT_MAX_AGE_DAYS: u64 = 7;

/// Calendar used to add the max age to a timestamp.
///
/// Day arithmetic happens on the wall clock of this zone, so a week stays a
/// week across DST transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CalendarZone {
    Utc,
    #[default]
    Local,
    Offset {
        seconds: i32,
    },
}

/// Pure freshness test for a cached snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    max_age_days: u64,
    zone: CalendarZone,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl CachePolicy {
    pub fn new() -> Self {
        CachePolicy {
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            zone: CalendarZone::Local,
        }
    }

    pub fn with_max_age_days(mut self, days: u64) -> Self {
        self.max_age_days = days;
        self
    }

    pub fn with_zone(mut self, zone: CalendarZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn max_age_days(&self) -> u64 {
        self.max_age_days
    }

    pub fn zone(&self) -> CalendarZone {
        self.zone
    }

    /// True when `current` is strictly before `timestamp` plus the max age.
    ///
    /// An expiry that cannot be computed (overflow or an out-of-range offset)
    /// counts as stale.
    pub fn is_valid(&self, current: DateTime<Utc>, timestamp: DateTime<Utc>) -> bool {
        match self.expiry(timestamp) {
            Some(expiry) => current < expiry,
            None => false,
        }
    }

    /// The first instant at which a snapshot taken at `timestamp` is stale.
    pub fn expiry(&self, timestamp: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = Days::new(self.max_age_days);
        match self.zone {
            CalendarZone::Utc => timestamp.checked_add_days(days),
            CalendarZone::Local => add_days_in(&Local, timestamp, days),
            CalendarZone::Offset { seconds } => {
                let offset = FixedOffset::east_opt(seconds)?;
                add_days_in(&offset, timestamp, days)
            }
        }
    }
}

/// Add `days` on the wall clock of `zone`.
///
/// A result in a DST overlap takes the earlier instant. A result in a DST gap
/// keeps the offset in force before the gap, which lands it just past the gap.
fn add_days_in<Tz: TimeZone>(
    zone: &Tz,
    timestamp: DateTime<Utc>,
    days: Days,
) -> Option<DateTime<Utc>> {
    let local = timestamp.with_timezone(zone).naive_local().checked_add_days(days)?;
    if let Some(expiry) = zone.from_local_datetime(&local).earliest() {
        return Some(expiry.with_timezone(&Utc));
    }

    // Any instant a day before the gap still carries the pre-gap offset.
    let before_gap = local.checked_sub_signed(TimeDelta::days(1))?;
    let offset = zone.offset_from_utc_datetime(&before_gap).fix();
    let utc = local.checked_sub_signed(TimeDelta::seconds(i64::from(offset.local_minus_utc())))?;
    Some(utc.and_utc())
}
