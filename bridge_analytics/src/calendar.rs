//! Fixed-offset calendar for time bucket keys

use crate::config::CalendarConfig;
use crate::error::{AnalyticsError, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Calendar slot an instant falls into.
///
/// Ordering follows `(year, month, day_of_week, hour)`, the order the
/// decomposer walks a bridge's buckets in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub year: i32,
    /// 1 = January
    pub month: u32,
    /// 1 = Sunday, 7 = Saturday
    pub day_of_week: u32,
    /// 0..=23
    pub hour: u32,
}

impl TimeSlot {
    pub fn is_weekend(&self) -> bool {
        matches!(self.day_of_week, 1 | 7)
    }

    /// Weekday commuter peaks, 07:00-09:59 and 16:00-18:59
    pub fn is_rush_hour(&self) -> bool {
        !self.is_weekend() && matches!(self.hour, 7..=9 | 16..=18)
    }

    pub fn is_summer(&self) -> bool {
        (5..=9).contains(&self.month)
    }

    /// Calendar-naive holiday bump: all of July, and Mondays in May and September.
    pub fn holiday_adjustment(&self) -> f64 {
        let holiday = self.month == 7
            || (self.month == 5 && self.day_of_week == 2)
            || (self.month == 9 && self.day_of_week == 2);

        if holiday {
            0.3
        } else {
            0.0
        }
    }
}

/// Calendar with a fixed UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCalendar {
    offset: FixedOffset,
}

impl Default for SlotCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl SlotCalendar {
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn with_offset_minutes(minutes: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
            AnalyticsError::InvalidParameter(format!("UTC offset of {} minutes", minutes))
        })?;
        Ok(Self { offset })
    }

    pub fn from_config(config: &CalendarConfig) -> Result<Self> {
        Self::with_offset_minutes(config.utc_offset_minutes)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Slot `at` falls into in this calendar
    pub fn slot(&self, at: DateTime<Utc>) -> TimeSlot {
        let local = at.with_timezone(&self.offset);
        TimeSlot {
            year: local.year(),
            month: local.month(),
            day_of_week: local.weekday().number_from_sunday(),
            hour: local.hour(),
        }
    }

    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Count the local days between `start` and `end` (inclusive) per
    /// `(year, month, day_of_week)`.
    ///
    /// Each counted day offers exactly one slot for any given hour, so this is
    /// the number of possible opening slots for a bucket over the span.
    pub fn day_census(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> HashMap<(i32, u32, u32), u32> {
        let mut census = HashMap::new();
        let (first, last) = if start <= end {
            (self.local_date(start), self.local_date(end))
        } else {
            (self.local_date(end), self.local_date(start))
        };

        let mut day = Some(first);
        while let Some(current) = day {
            if current > last {
                break;
            }
            let key = (
                current.year(),
                current.month(),
                current.weekday().number_from_sunday(),
            );
            *census.entry(key).or_insert(0) += 1;
            day = current.succ_opt();
        }

        census
    }
}
