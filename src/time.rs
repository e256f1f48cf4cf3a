//! Clock and calendar queries.
//!
//! Calendar conversions use the C library's `gmtime_r`, `localtime_r`, `timegm` and
//! `mktime`, so local time follows the process's `TZ` setting.

use std::io;

use thiserror::Error;

use crate::posix;

#[derive(Debug, Error)]
pub enum TimeError {
    #[error("clock unavailable: {0}")]
    Clock(#[source] io::Error),

    #[error("{secs} seconds since the epoch has no calendar representation: {source}")]
    Calendar {
        secs: i64,
        #[source]
        source: io::Error,
    },

    #[error("calendar time has no representation in seconds since the epoch: {0}")]
    Linear(#[source] io::Error),

    #[error("{0} does not fit in time_t")]
    Overflow(i64),
}

/// A point on a clock, as returned by `clock_gettime`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Timespec {
    pub sec: i64,
    /// Always in `0..1_000_000_000`.
    pub nsec: i64,
}

impl Timespec {
    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + self.nsec as f64 / 1e9
    }
}

fn now(clock: libc::clockid_t) -> Result<Timespec, TimeError> {
    let ts = posix::clock_gettime(clock).map_err(TimeError::Clock)?;
    Ok(Timespec {
        sec: ts.tv_sec as i64,
        nsec: ts.tv_nsec as i64,
    })
}

/// Wall-clock time since the Unix epoch.
pub fn realtime_now() -> Result<Timespec, TimeError> {
    now(posix::CLOCK_REALTIME)
}

/// Time on a clock that never runs backward. Only differences are meaningful.
pub fn monotonic_now() -> Result<Timespec, TimeError> {
    now(posix::CLOCK_MONOTONIC)
}

/// Processor time used by this process, in clock ticks.
pub fn processor_clock() -> Result<i64, TimeError> {
    posix::clock().map_err(TimeError::Clock)
}

/// Converts clock ticks from [`processor_clock`] to seconds.
pub fn clocks_to_secs(clocks: i64) -> f64 {
    clocks as f64 / posix::CLOCKS_PER_SEC as f64
}

/// Which time zone calendar conversions use.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Zone {
    Utc,
    /// The process's local time zone.
    Local,
}

/// Broken-down calendar time, with the same fields and conventions as C's `struct tm`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct CalendarTime {
    /// Seconds, `0..=60`.
    pub sec: i32,
    /// Minutes, `0..=59`.
    pub min: i32,
    /// Hours, `0..=23`.
    pub hour: i32,
    /// Day of the month, `1..=31`.
    pub mday: i32,
    /// Month, `0..=11`.
    pub mon: i32,
    /// Years since 1900.
    pub year: i32,
    /// Days since Sunday, `0..=6`. Ignored by [`from_calendar`].
    pub wday: i32,
    /// Days since January 1, `0..=365`. Ignored by [`from_calendar`].
    pub yday: i32,
    /// Positive if daylight saving time is in effect, 0 if not, negative if unknown.
    pub isdst: i32,
}

impl From<&libc::tm> for CalendarTime {
    fn from(tm: &libc::tm) -> CalendarTime {
        CalendarTime {
            sec: tm.tm_sec,
            min: tm.tm_min,
            hour: tm.tm_hour,
            mday: tm.tm_mday,
            mon: tm.tm_mon,
            year: tm.tm_year,
            wday: tm.tm_wday,
            yday: tm.tm_yday,
            isdst: tm.tm_isdst,
        }
    }
}

impl CalendarTime {
    fn to_tm(self) -> libc::tm {
        // Zeroing also clears the platform-specific fields (tm_gmtoff, tm_zone).
        let mut tm: libc::tm = unsafe { std::mem::zeroed() };
        tm.tm_sec = self.sec;
        tm.tm_min = self.min;
        tm.tm_hour = self.hour;
        tm.tm_mday = self.mday;
        tm.tm_mon = self.mon;
        tm.tm_year = self.year;
        tm.tm_wday = self.wday;
        tm.tm_yday = self.yday;
        tm.tm_isdst = self.isdst;
        tm
    }
}

/// Breaks `secs` since the epoch down into calendar fields.
pub fn to_calendar(secs: i64, zone: Zone) -> Result<CalendarTime, TimeError> {
    let t = libc::time_t::try_from(secs).map_err(|_| TimeError::Overflow(secs))?;
    let tm = match zone {
        Zone::Utc => posix::gmtime_r(t),
        Zone::Local => posix::localtime_r(t),
    }
    .map_err(|source| TimeError::Calendar { secs, source })?;
    Ok(CalendarTime::from(&tm))
}

/// Converts calendar fields back to seconds since the epoch.
///
/// Out-of-range fields are normalized the way `mktime` does, so e.g. month 12 of 2023
/// is January 2024.
pub fn from_calendar(cal: &CalendarTime, zone: Zone) -> Result<i64, TimeError> {
    let mut tm = cal.to_tm();
    let t = match zone {
        Zone::Utc => posix::timegm(&mut tm),
        Zone::Local => posix::mktime(&mut tm),
    }
    .map_err(TimeError::Linear)?;
    Ok(t as i64)
}
