//! Calendar

use chrono::NaiveDate;
use thiserror::Error;

/// Errors related to calendar range construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    /// The end date does not fall strictly after the start date.
    #[error("range end {end} must fall strictly after start {start}")]
    InvalidRange {
        /// First rental day.
        start: NaiveDate,
        /// Day after the last rental day.
        end: NaiveDate,
    },
}

/// A half-open calendar date range `[start, end)`.
///
/// `start < end` is enforced at construction, so a range always covers at
/// least one whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a new date range.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidRange`] unless `start < end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CalendarError> {
        if start < end {
            Ok(DateRange { start, end })
        } else {
            Err(CalendarError::InvalidRange { start, end })
        }
    }

    /// First day of the range.
    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Day after the last day of the range.
    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of whole days covered by the range (always at least 1).
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Whether `date` falls inside the range (`start <= date < end`).
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Half-open overlap test: `[s1, e1)` and `[s2, e2)` conflict iff
    /// `s1 < e2 && s2 < e1`.
    #[must_use]
    pub fn conflicts_with(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Iterates over every day in the range, in order, excluding `end`.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;

        self.start.iter_days().take_while(move |day| *day < end)
    }
}
