//! Publish-time policy
//!
//! Posts go out immediately inside the high-traffic windows and are otherwise
//! scheduled for the next slot hour with a random minute. Everything here is
//! a pure function of `now` and the random draw, evaluated in the configured
//! fixed offset (KST by default).
//!
//! Weekly content is keyed by [`WeekPeriod`], the Monday-to-Sunday week.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Timelike, Weekday};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

/// Default publish windows as half-open hour ranges
pub const DEFAULT_WINDOWS: &[(u32, u32)] = &[(9, 11), (13, 15), (17, 19)];

/// Default slot hours for deferred posts
pub const DEFAULT_SLOT_HOURS: &[u32] = &[10, 14, 18];

/// KST offset in hours
pub const KST_OFFSET_HOURS: i32 = 9;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid hour {0}; expected 0-23")]
    InvalidHour(u32),

    #[error("Invalid window {start}..{end}")]
    InvalidWindow { start: u32, end: u32 },

    #[error("At least one slot hour is required")]
    NoSlots,

    #[error("Invalid UTC offset: {0} hours")]
    InvalidOffset(i32),
}

/// Whether to publish now or at a later slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PublishTiming {
    Immediate,
    Scheduled(DateTime<FixedOffset>),
}

/// Publish windows and deferral slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishWindows {
    windows: Vec<(u32, u32)>,
    slot_hours: Vec<u32>,
    offset: FixedOffset,
}

impl PublishWindows {
    /// Build a policy; slot hours are sorted ascending
    pub fn new(
        windows: Vec<(u32, u32)>,
        mut slot_hours: Vec<u32>,
        offset: FixedOffset,
    ) -> Result<Self, ScheduleError> {
        for &(start, end) in &windows {
            if start >= end || end > 24 {
                return Err(ScheduleError::InvalidWindow { start, end });
            }
        }
        if slot_hours.is_empty() {
            return Err(ScheduleError::NoSlots);
        }
        if let Some(&hour) = slot_hours.iter().find(|&&h| h > 23) {
            return Err(ScheduleError::InvalidHour(hour));
        }
        slot_hours.sort_unstable();
        slot_hours.dedup();

        Ok(Self {
            windows,
            slot_hours,
            offset,
        })
    }

    /// Default windows in the given UTC offset
    pub fn with_offset_hours(hours: i32) -> Result<Self, ScheduleError> {
        let offset =
            FixedOffset::east_opt(hours * 3600).ok_or(ScheduleError::InvalidOffset(hours))?;
        Self::new(DEFAULT_WINDOWS.to_vec(), DEFAULT_SLOT_HOURS.to_vec(), offset)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn windows(&self) -> &[(u32, u32)] {
        &self.windows
    }

    pub fn slot_hours(&self) -> &[u32] {
        &self.slot_hours
    }

    /// False iff the local hour lies inside a window
    pub fn should_defer<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        let hour = now.with_timezone(&self.offset).hour();
        !self
            .windows
            .iter()
            .any(|&(start, end)| hour >= start && hour < end)
    }

    /// First slot strictly after `now`, with a random minute
    ///
    /// Falls through to the first slot hour of the next day.
    pub fn next_slot<Tz: TimeZone, R: Rng + ?Sized>(
        &self,
        now: &DateTime<Tz>,
        rng: &mut R,
    ) -> DateTime<FixedOffset> {
        let local = now.with_timezone(&self.offset);
        let minute = rng.gen_range(0..60);
        let today = local.date_naive();
        let tomorrow = today + Duration::days(1);

        self.slot_hours
            .iter()
            .map(|&hour| (today, hour))
            .chain(self.slot_hours.first().map(|&hour| (tomorrow, hour)))
            .filter_map(|(date, hour)| self.at(date, hour, minute))
            .find(|slot| *slot > local)
            .unwrap_or_else(|| local + Duration::days(1))
    }

    /// Publish now inside a window, otherwise at the next slot
    pub fn decide<Tz: TimeZone, R: Rng + ?Sized>(
        &self,
        now: &DateTime<Tz>,
        rng: &mut R,
    ) -> PublishTiming {
        if self.should_defer(now) {
            PublishTiming::Scheduled(self.next_slot(now, rng))
        } else {
            PublishTiming::Immediate
        }
    }

    fn at(&self, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<FixedOffset>> {
        date.and_hms_opt(hour, minute, 0)?
            .and_local_timezone(self.offset)
            .single()
    }
}

/// A Monday-to-Sunday week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WeekPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekPeriod {
    /// The week that contains `date`
    pub fn containing(date: NaiveDate) -> Self {
        let start = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    /// Human-readable range, e.g. `2026-10-19 ~ 2026-10-25`
    pub fn label(&self) -> String {
        format!("{} ~ {}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }
}

/// Weekly posts go out on Mondays
pub fn is_weekly_publish_day(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Mon
}

impl Default for PublishWindows {
    fn default() -> Self {
        Self::with_offset_hours(KST_OFFSET_HOURS).expect("default publish windows are valid")
    }
}
