//! Civil date helpers.
//!
//! Pure, total functions over `NaiveDate` values. No time-of-day and no
//! timezone is involved anywhere in this module.

use chrono::{Datelike, NaiveDate};

/// Weekday index of a date, 0 = Sunday through 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Whether the date falls on a Saturday or Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(weekday_index(date), 0 | 6)
}

/// Whether `candidate` has the same day-of-month as `anchor`.
///
/// An anchor on the 31st never matches a 30-day month; there is no clamping.
pub fn same_day_of_month(anchor: NaiveDate, candidate: NaiveDate) -> bool {
    anchor.day() == candidate.day()
}

/// Inclusive range membership: `start <= date <= end`.
pub fn is_within(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    start <= date && date <= end
}

/// Number of days in `[start, end]`, or 0 when `start > end`.
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> i64 {
    if start > end {
        0
    } else {
        (end - start).num_days() + 1
    }
}

/// Consecutive civil days from `start` to `end` inclusive.
///
/// The sequence is lazy and finite. Cloning a `DayRange` restarts it from
/// wherever the cloned range stood, so a fresh `enumerate_days` call or a clone
/// taken before iteration can be walked again. `start > end` yields an empty
/// sequence.
pub fn enumerate_days(start: NaiveDate, end: NaiveDate) -> DayRange {
    DayRange {
        next: (start <= end).then_some(start),
        end,
    }
}

/// Iterator returned by [`enumerate_days`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRange {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for DayRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = current.succ_opt().filter(|d| *d <= self.end);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .next
            .map(|d| days_in_range(d, self.end) as usize)
            .unwrap_or(0);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DayRange {}

impl std::iter::FusedIterator for DayRange {}
