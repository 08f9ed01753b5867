//! Calendar primitives for recurring activities.
//!
//! - **Dates**: weekday index, day-of-month comparison, inclusive range
//!   membership and lazy day enumeration over civil dates
//! - **Recurrence**: rule types (`DAILY`, `DAILY_NO_WEEKEND`, `WEEKLY`,
//!   `MONTHLY`) and the evaluator deciding whether a rule produces an
//!   occurrence on a candidate date
//!
//! # Usage
//!
//! ```ignore
//! use civic_agenda::calendar::{enumerate_days, RecurrenceRule};
//! use chrono::NaiveDate;
//!
//! let anchor = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let rule = RecurrenceRule::weekly_on([1, 3])
//!     .until(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
//!
//! let mondays_and_wednesdays: Vec<_> = enumerate_days(anchor, rule.end_date.unwrap())
//!     .filter(|d| rule.matches(anchor, *d))
//!     .collect();
//! ```

pub mod dates;
pub mod recurrence;

pub use dates::{
    days_in_range, enumerate_days, is_weekend, is_within, same_day_of_month, weekday_index,
    DayRange,
};
pub use recurrence::{matches, RecurrencePattern, RecurrenceRule};
