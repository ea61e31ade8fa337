//! Availability

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;

use crate::{booking::BookingRequest, calendar::DateRange};

/// A per-day owner override for one equipment item.
///
/// Owned and edited by the equipment owner; the booking engine only ever
/// reads these.
#[derive(Debug, Clone)]
pub struct AvailabilitySlot<'a> {
    /// Day the override applies to.
    pub date: NaiveDate,

    /// Whether the day can be booked at all. Days without a slot default to
    /// available.
    pub is_available: bool,

    /// Optional rate replacing the equipment's base daily rate on this day.
    pub custom_rate: Option<Money<'a, Currency>>,
}

impl<'a> AvailabilitySlot<'a> {
    /// Creates an override that blocks the given day.
    #[must_use]
    pub fn blocked(date: NaiveDate) -> Self {
        AvailabilitySlot {
            date,
            is_available: false,
            custom_rate: None,
        }
    }

    /// Creates an override that re-rates the given day.
    #[must_use]
    pub fn with_rate(date: NaiveDate, rate: Money<'a, Currency>) -> Self {
        AvailabilitySlot {
            date,
            is_available: true,
            custom_rate: Some(rate),
        }
    }
}

/// Verdict of an availability check for a candidate date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// No blocking booking or blocked day touches the candidate range.
    Available,

    /// At least one day in the range is taken or blocked.
    Unavailable {
        /// The conflicting days, sorted and deduplicated.
        conflicting_dates: SmallVec<[NaiveDate; 8]>,
    },
}

impl Availability {
    /// Whether the candidate range can be booked.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// Decides whether `candidate` can be booked against the equipment's
/// existing bookings and per-day overrides.
///
/// A day conflicts if it falls inside a booking whose status still blocks
/// the calendar (pending, approved or active) or carries an explicit
/// `is_available = false` override. Cancelled, rejected and completed
/// bookings never block.
///
/// Callers confirming a booking must re-run this check atomically with the
/// insert; a verdict computed for display can be stale by the time the
/// renter confirms.
#[must_use]
pub fn resolve(
    candidate: &DateRange,
    existing: &[&BookingRequest<'_>],
    slots: &[AvailabilitySlot<'_>],
) -> Availability {
    let blocked_days: FxHashMap<NaiveDate, bool> = slots
        .iter()
        .map(|slot| (slot.date, slot.is_available))
        .collect();

    let blocking: Vec<&DateRange> = existing
        .iter()
        .filter(|booking| booking.status().blocks_availability())
        .map(|booking| booking.range())
        .collect();

    let mut conflicting_dates: SmallVec<[NaiveDate; 8]> = SmallVec::new();

    for day in candidate.iter_days() {
        let taken = blocking.iter().any(|range| range.contains(day));
        let blocked = blocked_days.get(&day).is_some_and(|available| !available);

        if taken || blocked {
            conflicting_dates.push(day);
        }
    }

    if conflicting_dates.is_empty() {
        Availability::Available
    } else {
        Availability::Unavailable { conflicting_dates }
    }
}
