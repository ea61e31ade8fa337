//! Bookings

use chrono::{DateTime, NaiveDate, Utc};
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use smallvec::SmallVec;
use thiserror::Error;

use crate::{availability::Availability, calendar::DateRange, equipment::EquipmentKey};

new_key_type! {
    /// Booking Key
    pub struct BookingKey;
}

/// Errors raised by booking transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookingError {
    /// The requested edge is not in the lifecycle adjacency.
    #[error("cannot move booking from {from:?} to {to:?}")]
    IllegalTransition {
        /// Current status.
        from: BookingStatus,
        /// Requested status.
        to: BookingStatus,
    },

    /// The acting party is not permitted to perform the transition.
    #[error("{party:?} may not {action} this booking")]
    Unauthorized {
        /// Party that attempted the transition.
        party: Party,
        /// Human-readable name of the attempted action.
        action: &'static str,
    },

    /// A fresh availability check found the requested dates taken.
    #[error("requested dates are no longer available")]
    Conflict {
        /// The days that are taken or blocked.
        conflicting_dates: SmallVec<[NaiveDate; 8]>,
    },

    /// Pickup inspection has not been recorded, so the rental cannot start.
    #[error("pickup inspection not completed")]
    PickupInspectionPending,

    /// Return inspection has not been recorded, so the rental cannot end.
    #[error("return inspection not completed")]
    ReturnInspectionPending,

    /// Cancellation was attempted on or after the rental start date.
    #[error("cancellation window closed; rental starts {start}")]
    CancellationWindowClosed {
        /// First rental day.
        start: NaiveDate,
    },
}

/// The closed set of booking lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created by the renter, awaiting the owner's decision.
    Pending,

    /// Accepted by the owner, awaiting pickup.
    Approved,

    /// Equipment handed over; the rental window is running.
    Active,

    /// Equipment returned and inspected.
    Completed,

    /// Withdrawn by either party before the rental started.
    Cancelled,

    /// Declined by the owner.
    Rejected,
}

impl BookingStatus {
    /// Whether this status still blocks the equipment calendar.
    #[must_use]
    pub fn blocks_availability(self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Approved | BookingStatus::Active
        )
    }

    /// Whether the status admits no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Rejected
        )
    }

    /// The lifecycle adjacency. Every transition goes through this table;
    /// no call site re-checks edges ad hoc.
    #[must_use]
    pub fn can_transition(self, to: BookingStatus) -> bool {
        matches!(
            (self, to),
            (
                BookingStatus::Pending,
                BookingStatus::Approved | BookingStatus::Rejected | BookingStatus::Cancelled
            ) | (
                BookingStatus::Approved,
                BookingStatus::Active | BookingStatus::Cancelled
            ) | (BookingStatus::Active, BookingStatus::Completed)
        )
    }
}

/// The role a party plays for a given booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    /// The equipment owner.
    Owner,

    /// The renting party.
    Renter,
}

/// The authenticated party attempting an operation, as supplied by the
/// caller's identity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    party: Party,
    id: String,
}

impl Actor {
    /// Creates an actor with the given role and identity.
    pub fn new(party: Party, id: impl Into<String>) -> Self {
        Actor {
            party,
            id: id.into(),
        }
    }

    /// The actor's role.
    #[must_use]
    pub fn party(&self) -> Party {
        self.party
    }

    /// The actor's identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// A renter's reservation proposal for an equipment item over a date range.
///
/// The stored total is stamped from the pricing calculator at creation time
/// and never recomputed afterwards. Status only ever changes through the
/// transition methods below, each of which bumps `version` so stores can
/// apply optimistic-concurrency preconditions.
#[derive(Debug, Clone)]
pub struct BookingRequest<'a> {
    equipment: EquipmentKey,
    renter: String,
    range: DateRange,
    total: Money<'a, Currency>,
    status: BookingStatus,
    message: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'a> BookingRequest<'a> {
    /// Creates a pending booking request with a stamped total.
    pub fn new(
        equipment: EquipmentKey,
        renter: impl Into<String>,
        range: DateRange,
        total: Money<'a, Currency>,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        BookingRequest {
            equipment,
            renter: renter.into(),
            range,
            total,
            status: BookingStatus::Pending,
            message,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The equipment being booked.
    #[must_use]
    pub fn equipment(&self) -> EquipmentKey {
        self.equipment
    }

    /// Identity of the renting party.
    #[must_use]
    pub fn renter(&self) -> &str {
        &self.renter
    }

    /// The booked date range.
    #[must_use]
    pub fn range(&self) -> &DateRange {
        &self.range
    }

    /// The total stamped at creation time.
    #[must_use]
    pub fn total(&self) -> &Money<'a, Currency> {
        &self.total
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> BookingStatus {
        self.status
    }

    /// Optional message from the renter.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Optimistic-concurrency version, bumped on every applied transition.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Timestamp of the last applied transition.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Owner accepts a pending request.
    ///
    /// Takes a **fresh** availability verdict so a request that raced
    /// another booking onto the same dates is rejected here rather than
    /// silently double-booked.
    ///
    /// # Errors
    ///
    /// [`BookingError::Unauthorized`] unless the actor is the owner;
    /// [`BookingError::Conflict`] if the verdict reports taken days;
    /// [`BookingError::IllegalTransition`] unless the booking is pending.
    pub fn approve(
        &mut self,
        actor: &Actor,
        availability: &Availability,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        require_party(actor, Party::Owner, "approve")?;

        if let Availability::Unavailable { conflicting_dates } = availability {
            return Err(BookingError::Conflict {
                conflicting_dates: conflicting_dates.clone(),
            });
        }

        self.transition(BookingStatus::Approved, now)
    }

    /// Owner declines a pending request.
    ///
    /// # Errors
    ///
    /// [`BookingError::Unauthorized`] unless the actor is the owner;
    /// [`BookingError::IllegalTransition`] unless the booking is pending.
    pub fn reject(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<(), BookingError> {
        require_party(actor, Party::Owner, "reject")?;

        self.transition(BookingStatus::Rejected, now)
    }

    /// Either party withdraws before the rental start date.
    ///
    /// # Errors
    ///
    /// [`BookingError::CancellationWindowClosed`] on or after the start
    /// date; [`BookingError::IllegalTransition`] once the rental is active
    /// or the booking is terminal.
    pub fn cancel(
        &mut self,
        _actor: &Actor,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        if !self.status.can_transition(BookingStatus::Cancelled) {
            return Err(BookingError::IllegalTransition {
                from: self.status,
                to: BookingStatus::Cancelled,
            });
        }

        if today >= self.range.start() {
            return Err(BookingError::CancellationWindowClosed {
                start: self.range.start(),
            });
        }

        self.transition(BookingStatus::Cancelled, now)
    }

    /// Owner records the completed pickup inspection, starting the rental.
    ///
    /// The inspection signal is the trigger; the calendar date alone never
    /// activates a booking.
    ///
    /// # Errors
    ///
    /// [`BookingError::PickupInspectionPending`] if the inspection has not
    /// completed; [`BookingError::Unauthorized`] /
    /// [`BookingError::IllegalTransition`] per the usual guards.
    pub fn activate(
        &mut self,
        actor: &Actor,
        pickup_inspection_completed: bool,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        require_party(actor, Party::Owner, "activate")?;

        if !pickup_inspection_completed {
            return Err(BookingError::PickupInspectionPending);
        }

        self.transition(BookingStatus::Active, now)
    }

    /// Owner records the completed return inspection, ending the rental.
    ///
    /// # Errors
    ///
    /// [`BookingError::ReturnInspectionPending`] if the inspection has not
    /// completed; [`BookingError::Unauthorized`] /
    /// [`BookingError::IllegalTransition`] per the usual guards.
    pub fn complete(
        &mut self,
        actor: &Actor,
        return_inspection_completed: bool,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        require_party(actor, Party::Owner, "complete")?;

        if !return_inspection_completed {
            return Err(BookingError::ReturnInspectionPending);
        }

        self.transition(BookingStatus::Completed, now)
    }

    /// Applies a transition through the adjacency table, bumping the
    /// version and audit timestamp.
    fn transition(&mut self, to: BookingStatus, now: DateTime<Utc>) -> Result<(), BookingError> {
        if !self.status.can_transition(to) {
            return Err(BookingError::IllegalTransition {
                from: self.status,
                to,
            });
        }

        self.status = to;
        self.version += 1;
        self.updated_at = now;

        Ok(())
    }
}

/// Rejects the transition unless the actor holds the required role.
fn require_party(actor: &Actor, required: Party, action: &'static str) -> Result<(), BookingError> {
    if actor.party() == required {
        Ok(())
    } else {
        Err(BookingError::Unauthorized {
            party: actor.party(),
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rusty_money::{Money, iso::USD};
    use testresult::TestResult;

    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).expect("valid test date")
    }

    fn owner() -> Actor {
        Actor::new(Party::Owner, "owner-1")
    }

    fn renter() -> Actor {
        Actor::new(Party::Renter, "renter-1")
    }

    fn booking() -> TestResult<BookingRequest<'static>> {
        Ok(BookingRequest::new(
            EquipmentKey::default(),
            "renter-1",
            DateRange::new(date(15), date(20))?,
            Money::from_minor(52_500, USD),
            Some("weekend project".to_string()),
            Utc::now(),
        ))
    }

    #[test]
    fn new_booking_is_pending_with_version_zero() -> TestResult {
        let booking = booking()?;

        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.version(), 0);
        assert_eq!(booking.total(), &Money::from_minor(52_500, USD));
        assert_eq!(booking.message(), Some("weekend project"));

        Ok(())
    }

    #[test]
    fn full_lifecycle_reaches_completed() -> TestResult {
        let mut booking = booking()?;
        let now = Utc::now();

        booking.approve(&owner(), &Availability::Available, now)?;
        booking.activate(&owner(), true, now)?;
        booking.complete(&owner(), true, now)?;

        assert_eq!(booking.status(), BookingStatus::Completed);
        assert_eq!(booking.version(), 3);

        Ok(())
    }

    #[test]
    fn renter_cannot_approve() -> TestResult {
        let mut booking = booking()?;

        let err = booking
            .approve(&renter(), &Availability::Available, Utc::now())
            .expect_err("renter approval must be rejected");

        assert_eq!(
            err,
            BookingError::Unauthorized {
                party: Party::Renter,
                action: "approve",
            }
        );

        Ok(())
    }

    #[test]
    fn stale_availability_fails_approval() -> TestResult {
        let mut booking = booking()?;
        let verdict = Availability::Unavailable {
            conflicting_dates: [date(15)].into_iter().collect(),
        };

        let err = booking
            .approve(&owner(), &verdict, Utc::now())
            .expect_err("stale request must be rejected");

        assert!(matches!(err, BookingError::Conflict { .. }));
        assert_eq!(booking.status(), BookingStatus::Pending);

        Ok(())
    }

    #[test]
    fn activation_requires_pickup_inspection() -> TestResult {
        let mut booking = booking()?;
        booking.approve(&owner(), &Availability::Available, Utc::now())?;

        let err = booking
            .activate(&owner(), false, Utc::now())
            .expect_err("missing inspection must block activation");

        assert_eq!(err, BookingError::PickupInspectionPending);
        assert_eq!(booking.status(), BookingStatus::Approved);

        Ok(())
    }

    #[test]
    fn completion_requires_return_inspection() -> TestResult {
        let mut booking = booking()?;
        booking.approve(&owner(), &Availability::Available, Utc::now())?;
        booking.activate(&owner(), true, Utc::now())?;

        let err = booking
            .complete(&owner(), false, Utc::now())
            .expect_err("missing inspection must block completion");

        assert_eq!(err, BookingError::ReturnInspectionPending);

        Ok(())
    }

    #[test]
    fn cancel_before_start_date_succeeds_for_either_party() -> TestResult {
        let mut first = booking()?;
        first.cancel(&renter(), date(14), Utc::now())?;

        let mut second = booking()?;
        second.approve(&owner(), &Availability::Available, Utc::now())?;
        second.cancel(&owner(), date(14), Utc::now())?;

        assert_eq!(first.status(), BookingStatus::Cancelled);
        assert_eq!(second.status(), BookingStatus::Cancelled);

        Ok(())
    }

    #[test]
    fn cancel_on_start_date_is_rejected() -> TestResult {
        let mut booking = booking()?;

        let err = booking
            .cancel(&renter(), date(15), Utc::now())
            .expect_err("cancellation window must be closed");

        assert_eq!(
            err,
            BookingError::CancellationWindowClosed { start: date(15) }
        );

        Ok(())
    }

    #[test]
    fn active_booking_cannot_be_cancelled() -> TestResult {
        let mut booking = booking()?;
        booking.approve(&owner(), &Availability::Available, Utc::now())?;
        booking.activate(&owner(), true, Utc::now())?;

        let err = booking
            .cancel(&renter(), date(14), Utc::now())
            .expect_err("active bookings must not be cancellable");

        assert_eq!(
            err,
            BookingError::IllegalTransition {
                from: BookingStatus::Active,
                to: BookingStatus::Cancelled,
            }
        );

        Ok(())
    }

    #[test]
    fn terminal_states_admit_no_transitions() -> TestResult {
        let mut booking = booking()?;
        booking.reject(&owner(), Utc::now())?;

        let err = booking
            .approve(&owner(), &Availability::Available, Utc::now())
            .expect_err("rejected bookings are immutable");

        assert_eq!(
            err,
            BookingError::IllegalTransition {
                from: BookingStatus::Rejected,
                to: BookingStatus::Approved,
            }
        );

        Ok(())
    }

    #[test]
    fn adjacency_closure_rejects_every_undefined_edge() {
        use BookingStatus::{Active, Approved, Cancelled, Completed, Pending, Rejected};

        let all = [Pending, Approved, Active, Completed, Cancelled, Rejected];

        let defined = [
            (Pending, Approved),
            (Pending, Rejected),
            (Pending, Cancelled),
            (Approved, Active),
            (Approved, Cancelled),
            (Active, Completed),
        ];

        for from in all {
            for to in all {
                let expected = defined.contains(&(from, to));

                assert_eq!(
                    from.can_transition(to),
                    expected,
                    "unexpected adjacency verdict for {from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn skipping_approval_is_rejected() -> TestResult {
        let mut booking = booking()?;

        let err = booking
            .activate(&owner(), true, Utc::now())
            .expect_err("pending bookings cannot activate directly");

        assert_eq!(
            err,
            BookingError::IllegalTransition {
                from: BookingStatus::Pending,
                to: BookingStatus::Active,
            }
        );

        Ok(())
    }
}
