//! Countdown

use std::time::Duration;

use chrono::{DateTime, Utc};
use humanize_duration::{Truncate, prelude::DurationExt};
use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised when deriving countdown state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CountdownError {
    /// The rental window is empty or inverted.
    #[error("rental window end {end} must fall strictly after start {start}")]
    EmptyWindow {
        /// Window start instant.
        start: DateTime<Utc>,
        /// Window end instant.
        end: DateTime<Utc>,
    },
}

/// Presentation urgency tier derived from countdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// Plenty of rental time left.
    Normal,

    /// At least three quarters of the window has elapsed.
    Medium,

    /// At least ninety percent of the window has elapsed.
    High,

    /// The rental window has passed.
    Critical,
}

/// Derived time state for an active rental window.
///
/// Always recomputed from the two fixed endpoints and the current instant;
/// nothing here carries over between evaluations, so polling it every tick
/// accumulates no drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalCountdown {
    days_remaining: i64,
    hours_remaining: i64,
    minutes_remaining: i64,
    progress: u8,
    is_overdue: bool,
    end: DateTime<Utc>,
}

impl RentalCountdown {
    /// Derives countdown state for the window `[start, end]` at `now`.
    ///
    /// Progress is the elapsed share of the window as a rounded percentage,
    /// clamped to `0..=100` (0 before the window starts). Remaining time is
    /// `max(0, end - now)` floor-decomposed into days, hours and minutes;
    /// it is never rounded up.
    ///
    /// # Errors
    ///
    /// Returns [`CountdownError::EmptyWindow`] unless `start < end`.
    pub fn evaluate(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, CountdownError> {
        if start >= end {
            return Err(CountdownError::EmptyWindow { start, end });
        }

        let remaining_minutes = (end - now).num_minutes().max(0);

        Ok(RentalCountdown {
            days_remaining: remaining_minutes / (24 * 60),
            hours_remaining: (remaining_minutes % (24 * 60)) / 60,
            minutes_remaining: remaining_minutes % 60,
            progress: progress_percent(start, end, now),
            is_overdue: now > end,
            end,
        })
    }

    /// Whole days left in the window.
    #[must_use]
    pub fn days_remaining(&self) -> i64 {
        self.days_remaining
    }

    /// Hours left after the whole days.
    #[must_use]
    pub fn hours_remaining(&self) -> i64 {
        self.hours_remaining
    }

    /// Minutes left after the whole hours.
    #[must_use]
    pub fn minutes_remaining(&self) -> i64 {
        self.minutes_remaining
    }

    /// Elapsed share of the window, `0..=100`.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Whether the window end has passed.
    #[must_use]
    pub fn is_overdue(&self) -> bool {
        self.is_overdue
    }

    /// End of the rental window.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Presentation urgency tier for this state.
    #[must_use]
    pub fn urgency(&self) -> Urgency {
        if self.is_overdue {
            Urgency::Critical
        } else if self.progress >= 90 {
            Urgency::High
        } else if self.progress >= 75 {
            Urgency::Medium
        } else {
            Urgency::Normal
        }
    }

    /// Human-readable remaining time, truncated to minutes.
    #[must_use]
    pub fn remaining_label(&self) -> String {
        let minutes = self.days_remaining * 24 * 60 + self.hours_remaining * 60
            + self.minutes_remaining;

        let Ok(seconds) = u64::try_from(minutes * 60) else {
            unreachable!("remaining time is clamped to be non-negative")
        };

        Duration::from_secs(seconds)
            .human(Truncate::Minute)
            .to_string()
    }
}

/// Rounded, clamped elapsed percentage of the window.
fn progress_percent(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> u8 {
    if now < start {
        return 0;
    }

    let elapsed = (now - start).num_seconds();
    let window = (end - start).num_seconds();

    let (Some(elapsed), Some(window)) = (Decimal::from_i64(elapsed), Decimal::from_i64(window))
    else {
        unreachable!("always returns `Some` for every `i64`")
    };

    // window > 0 is guaranteed by the EmptyWindow guard.
    let ratio = (elapsed / window) * Decimal::ONE_HUNDRED;
    let rounded = ratio.round().to_i64().unwrap_or(100);

    let Ok(percent) = u8::try_from(rounded.clamp(0, 100)) else {
        unreachable!("clamped to 0..=100")
    };

    percent
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn instant(day: u32, hour: u32) -> DateTime<Utc> {
        chrono::NaiveDate::from_ymd_opt(2024, 6, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid test instant")
            .and_utc()
    }

    #[test]
    fn ninety_percent_progress_with_half_day_left() -> TestResult {
        // start=06-15T00:00, end=06-20T00:00, now=06-19T12:00
        let c = RentalCountdown::evaluate(instant(15, 0), instant(20, 0), instant(19, 12))?;

        assert_eq!(c.progress(), 90);
        assert!(!c.is_overdue());
        assert_eq!(c.days_remaining(), 0);
        assert_eq!(c.hours_remaining(), 12);
        assert_eq!(c.minutes_remaining(), 0);
        assert_eq!(c.urgency(), Urgency::High);

        Ok(())
    }

    #[test]
    fn before_start_progress_is_zero() -> TestResult {
        let c = RentalCountdown::evaluate(instant(15, 0), instant(20, 0), instant(14, 6))?;

        assert_eq!(c.progress(), 0);
        assert!(!c.is_overdue());
        assert_eq!(c.urgency(), Urgency::Normal);

        Ok(())
    }

    #[test]
    fn overdue_is_critical_with_nothing_remaining() -> TestResult {
        let c = RentalCountdown::evaluate(instant(15, 0), instant(20, 0), instant(21, 3))?;

        assert!(c.is_overdue());
        assert_eq!(c.progress(), 100);
        assert_eq!(c.days_remaining(), 0);
        assert_eq!(c.hours_remaining(), 0);
        assert_eq!(c.minutes_remaining(), 0);
        assert_eq!(c.urgency(), Urgency::Critical);

        Ok(())
    }

    #[test]
    fn exactly_at_end_is_not_overdue() -> TestResult {
        let c = RentalCountdown::evaluate(instant(15, 0), instant(20, 0), instant(20, 0))?;

        assert!(!c.is_overdue());
        assert_eq!(c.progress(), 100);

        Ok(())
    }

    #[test]
    fn progress_stays_in_bounds_across_the_window() -> TestResult {
        let start = instant(15, 0);
        let end = instant(20, 0);

        for day in 10..25 {
            for hour in [0, 6, 12, 18] {
                let c = RentalCountdown::evaluate(start, end, instant(day, hour))?;

                assert!(c.progress() <= 100, "progress must be clamped to 100");
                assert_eq!(
                    c.is_overdue(),
                    instant(day, hour) > end,
                    "overdue must equal now > end"
                );
            }
        }

        Ok(())
    }

    #[test]
    fn remaining_time_uses_floor_division() -> TestResult {
        // 1 day, 1 hour, 30 minutes remaining
        let end = instant(20, 0);
        let now = end - chrono::Duration::minutes(24 * 60 + 90);

        let c = RentalCountdown::evaluate(instant(15, 0), end, now)?;

        assert_eq!(c.days_remaining(), 1);
        assert_eq!(c.hours_remaining(), 1);
        assert_eq!(c.minutes_remaining(), 30);

        Ok(())
    }

    #[test]
    fn medium_urgency_at_seventy_five_percent() -> TestResult {
        let c = RentalCountdown::evaluate(instant(15, 0), instant(19, 0), instant(18, 0))?;

        assert_eq!(c.progress(), 75);
        assert_eq!(c.urgency(), Urgency::Medium);

        Ok(())
    }

    #[test]
    fn empty_window_is_rejected() {
        let result = RentalCountdown::evaluate(instant(20, 0), instant(15, 0), instant(16, 0));

        assert!(matches!(result, Err(CountdownError::EmptyWindow { .. })));
    }

    #[test]
    fn reevaluation_is_idempotent() -> TestResult {
        let first = RentalCountdown::evaluate(instant(15, 0), instant(20, 0), instant(17, 6))?;
        let second = RentalCountdown::evaluate(instant(15, 0), instant(20, 0), instant(17, 6))?;

        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn remaining_label_is_humanized() -> TestResult {
        let end = instant(20, 0);
        let now = end - chrono::Duration::minutes(24 * 60 + 90);

        let c = RentalCountdown::evaluate(instant(15, 0), end, now)?;
        let label = c.remaining_label();

        assert!(label.contains("1d"), "expected days in {label:?}");
        assert!(label.contains("1h"), "expected hours in {label:?}");

        Ok(())
    }
}
