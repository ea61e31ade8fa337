//! Engine

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    availability::{self, Availability},
    booking::{Actor, BookingError, BookingKey, BookingRequest, BookingStatus, Party},
    calendar::{CalendarError, DateRange},
    claims::{ClaimError, ClaimKey, ClaimStatus, DamageClaim, RenterResponse},
    config::EngineConfig,
    countdown::{CountdownError, RentalCountdown},
    equipment::EquipmentKey,
    escrow::{self, Deposit, EscrowError},
    pricing::{self, PricingError, Quote},
    store::{RecordStore, StoreError},
};

/// Errors surfaced by engine operations. Every variant wraps the error of
/// the module that refused the operation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Date range construction failed.
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// Quoting failed.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// A booking transition was refused.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// A claim transition or split was refused.
    #[error(transparent)]
    Claim(#[from] ClaimError),

    /// A deposit operation was refused.
    #[error(transparent)]
    Escrow(#[from] EscrowError),

    /// A record-store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Countdown derivation failed.
    #[error(transparent)]
    Countdown(#[from] CountdownError),

    /// The acting party may not perform the operation.
    #[error("{party:?} may not {action}")]
    Unauthorized {
        /// Party that attempted the operation.
        party: Party,
        /// Human-readable name of the attempted operation.
        action: &'static str,
    },
}

/// Orchestrates the booking lifecycle and financial settlement over a
/// [`RecordStore`].
///
/// The engine owns no state beyond its configuration; every operation reads
/// the records it needs, applies the domain transition, and writes the
/// result back under the version it read.
#[derive(Debug)]
pub struct Engine<'a, S: RecordStore<'a>> {
    config: EngineConfig,
    store: S,
    _lifetime: std::marker::PhantomData<&'a ()>,
}

impl<'a, S: RecordStore<'a>> Engine<'a, S> {
    /// Creates an engine over the given store.
    pub fn new(config: EngineConfig, store: S) -> Self {
        Engine {
            config,
            store,
            _lifetime: std::marker::PhantomData,
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Prices a prospective rental without touching any records.
    ///
    /// # Errors
    ///
    /// [`EngineError::Store`] if the equipment is unknown;
    /// [`EngineError::Pricing`] if quoting fails.
    pub fn quote_rental(
        &self,
        equipment: EquipmentKey,
        range: &DateRange,
    ) -> Result<Quote<'a>, EngineError> {
        let record = self.store.equipment(equipment)?;
        let slots = self.store.slots_for_equipment(equipment);

        Ok(pricing::quote(
            &record.daily_rate,
            range,
            self.config.fee_rate,
            slots,
        )?)
    }

    /// Checks whether `range` can currently be booked for the equipment.
    ///
    /// Advisory only; the authoritative check runs inside
    /// [`Engine::request_booking`].
    ///
    /// # Errors
    ///
    /// [`EngineError::Store`] if the equipment is unknown.
    pub fn check_availability(
        &self,
        equipment: EquipmentKey,
        range: &DateRange,
    ) -> Result<Availability, EngineError> {
        self.store.equipment(equipment)?;

        let bookings = self.store.bookings_for_equipment(equipment);
        let existing: Vec<&BookingRequest<'a>> =
            bookings.iter().map(|(_, booking)| *booking).collect();
        let slots = self.store.slots_for_equipment(equipment);

        Ok(availability::resolve(range, &existing, slots))
    }

    /// Renter requests a booking: quote the range, stamp the total, and
    /// insert atomically against the current calendar.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`] unless the actor is a renter;
    /// [`EngineError::Store`] with [`StoreError::Unavailable`] if the dates
    /// are taken; pricing and lookup failures as their wrapped variants.
    pub fn request_booking(
        &mut self,
        actor: &Actor,
        equipment: EquipmentKey,
        range: DateRange,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<BookingKey, EngineError> {
        if actor.party() != Party::Renter {
            return Err(EngineError::Unauthorized {
                party: actor.party(),
                action: "request a booking",
            });
        }

        let quote = self.quote_rental(equipment, &range)?;

        let booking = BookingRequest::new(
            equipment,
            actor.id(),
            range,
            *quote.total(),
            message,
            now,
        );

        Ok(self.store.insert_booking_if_available(booking)?)
    }

    /// Owner approves a pending request after a fresh availability check
    /// that excludes the request itself, then takes the equipment's deposit
    /// into escrow.
    ///
    /// # Errors
    ///
    /// [`EngineError::Booking`] with [`BookingError::Conflict`] if another
    /// booking took the dates since the request was filed; authorization,
    /// transition and store failures as their wrapped variants.
    pub fn approve_booking(
        &mut self,
        actor: &Actor,
        key: BookingKey,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut booking = self.store.booking(key)?.clone();
        let expected_version = booking.version();

        let bookings = self.store.bookings_for_equipment(booking.equipment());
        let others: Vec<&BookingRequest<'a>> = bookings
            .iter()
            .filter(|(other, _)| *other != key)
            .map(|(_, other)| *other)
            .collect();
        let slots = self.store.slots_for_equipment(booking.equipment());

        let verdict = availability::resolve(booking.range(), &others, slots);

        booking.approve(actor, &verdict, now)?;

        let deposit = Deposit::held(self.store.equipment(booking.equipment())?.deposit);

        self.store.update_booking(key, expected_version, booking)?;
        self.store.put_deposit(key, deposit);

        Ok(())
    }

    /// Owner declines a pending request.
    ///
    /// # Errors
    ///
    /// Authorization, transition and store failures as their wrapped
    /// variants.
    pub fn reject_booking(
        &mut self,
        actor: &Actor,
        key: BookingKey,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut booking = self.store.booking(key)?.clone();
        let expected_version = booking.version();

        booking.reject(actor, now)?;

        Ok(self.store.update_booking(key, expected_version, booking)?)
    }

    /// Either party cancels before the rental start date. A held deposit is
    /// refunded in full.
    ///
    /// # Errors
    ///
    /// [`EngineError::Booking`] with
    /// [`BookingError::CancellationWindowClosed`] on or after the start
    /// date; transition and store failures as their wrapped variants.
    pub fn cancel_booking(
        &mut self,
        actor: &Actor,
        key: BookingKey,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut booking = self.store.booking(key)?.clone();
        let expected_version = booking.version();

        booking.cancel(actor, today, now)?;

        self.store.update_booking(key, expected_version, booking)?;

        // A deposit only exists once the booking was approved.
        if let Ok(deposit) = self.store.deposit(key) {
            let mut deposit = deposit.clone();

            deposit.mark_refunded(now)?;
            self.store.put_deposit(key, deposit);
        }

        Ok(())
    }

    /// Owner records the completed pickup inspection, activating the
    /// rental.
    ///
    /// # Errors
    ///
    /// [`EngineError::Booking`] with
    /// [`BookingError::PickupInspectionPending`] if the inspection has not
    /// completed; authorization, transition and store failures as their
    /// wrapped variants.
    pub fn record_pickup(
        &mut self,
        actor: &Actor,
        key: BookingKey,
        inspection_completed: bool,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut booking = self.store.booking(key)?.clone();
        let expected_version = booking.version();

        booking.activate(actor, inspection_completed, now)?;

        Ok(self.store.update_booking(key, expected_version, booking)?)
    }

    /// Owner records the completed return inspection, completing the
    /// rental.
    ///
    /// # Errors
    ///
    /// [`EngineError::Booking`] with
    /// [`BookingError::ReturnInspectionPending`] if the inspection has not
    /// completed; authorization, transition and store failures as their
    /// wrapped variants.
    pub fn record_return(
        &mut self,
        actor: &Actor,
        key: BookingKey,
        inspection_completed: bool,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut booking = self.store.booking(key)?.clone();
        let expected_version = booking.version();

        booking.complete(actor, inspection_completed, now)?;

        Ok(self.store.update_booking(key, expected_version, booking)?)
    }

    /// Owner files a damage claim against a booking.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`] unless the actor is the owner;
    /// [`EngineError::Claim`] for a negative estimate; store failures as
    /// their wrapped variants.
    pub fn file_claim(
        &mut self,
        actor: &Actor,
        booking: BookingKey,
        description: impl Into<String>,
        estimated_cost: Money<'a, Currency>,
        now: DateTime<Utc>,
    ) -> Result<ClaimKey, EngineError> {
        if actor.party() != Party::Owner {
            return Err(EngineError::Unauthorized {
                party: actor.party(),
                action: "file a claim",
            });
        }

        self.store.booking(booking)?;

        let claim = DamageClaim::file(booking, description, estimated_cost, now)?;

        Ok(self.store.insert_claim(claim))
    }

    /// Renter responds to a pending claim. An accepted claim settles
    /// immediately at the filed estimate and consumes the deposit share.
    ///
    /// # Errors
    ///
    /// Authorization, transition, split and store failures as their wrapped
    /// variants.
    pub fn respond_to_claim(
        &mut self,
        actor: &Actor,
        key: ClaimKey,
        response: RenterResponse<'a>,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut claim = self.store.claim(key)?.clone();

        claim.respond(actor, response)?;

        if claim.status() == ClaimStatus::Accepted {
            let deposit = self.store.deposit(claim.booking())?.clone();
            let coverage = self
                .config
                .insurance_coverage(deposit.amount().currency());

            claim.settle_accepted(deposit.amount(), &coverage, now)?;

            self.consume_deposit(claim.booking(), &claim, deposit)?;
        }

        Ok(self.store.update_claim(key, claim)?)
    }

    /// Owner resolves a disputed claim at an agreed amount.
    ///
    /// # Errors
    ///
    /// Authorization, transition, split and store failures as their wrapped
    /// variants.
    pub fn resolve_claim(
        &mut self,
        actor: &Actor,
        key: ClaimKey,
        final_amount: Money<'a, Currency>,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut claim = self.store.claim(key)?.clone();
        let deposit = self.store.deposit(claim.booking())?.clone();
        let coverage = self
            .config
            .insurance_coverage(deposit.amount().currency());

        claim.resolve(actor, final_amount, deposit.amount(), &coverage, now)?;

        self.consume_deposit(claim.booking(), &claim, deposit)?;

        Ok(self.store.update_claim(key, claim)?)
    }

    /// Owner escalates a disputed claim to arbitration.
    ///
    /// # Errors
    ///
    /// Authorization, transition, split and store failures as their wrapped
    /// variants.
    pub fn escalate_claim(
        &mut self,
        actor: &Actor,
        key: ClaimKey,
        final_amount: Money<'a, Currency>,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut claim = self.store.claim(key)?.clone();
        let deposit = self.store.deposit(claim.booking())?.clone();
        let coverage = self
            .config
            .insurance_coverage(deposit.amount().currency());

        claim.escalate(actor, final_amount, deposit.amount(), &coverage, now)?;

        self.consume_deposit(claim.booking(), &claim, deposit)?;

        Ok(self.store.update_claim(key, claim)?)
    }

    /// Escalates every pending claim whose response window has lapsed,
    /// returning the keys that were escalated.
    ///
    /// # Errors
    ///
    /// Split and store failures as their wrapped variants; claims that do
    /// not qualify are skipped, not failed.
    pub fn sweep_auto_escalations(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ClaimKey>, EngineError> {
        let window = self.config.response_window();
        let mut escalated = Vec::new();

        for key in self.store.pending_claims() {
            let mut claim = self.store.claim(key)?.clone();

            if !claim.should_auto_escalate(now, window) {
                continue;
            }

            let deposit = self.store.deposit(claim.booking())?.clone();
            let coverage = self
                .config
                .insurance_coverage(deposit.amount().currency());

            claim.auto_escalate(deposit.amount(), &coverage, now)?;

            self.consume_deposit(claim.booking(), &claim, deposit)?;
            self.store.update_claim(key, claim)?;

            escalated.push(key);
        }

        Ok(escalated)
    }

    /// Releases the held deposit back to the renter once the rental is
    /// complete and no claims remain open.
    ///
    /// # Errors
    ///
    /// [`EngineError::Escrow`] with the policy reason of the first unmet
    /// precondition; store failures as their wrapped variants.
    pub fn release_deposit(
        &mut self,
        key: BookingKey,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let booking = self.store.booking(key)?;
        let return_inspection_completed = booking.status() == BookingStatus::Completed;
        let open_claims = self.store.open_claim_count(key);

        let mut deposit = self.store.deposit(key)?.clone();

        deposit.release(return_inspection_completed, open_claims, now)?;
        self.store.put_deposit(key, deposit);

        Ok(())
    }

    /// Refund owed to the renter: the deposit minus every resolved claim's
    /// deposit share, clamped at zero.
    ///
    /// # Errors
    ///
    /// Store and money failures as their wrapped variants.
    pub fn refund_due(&self, key: BookingKey) -> Result<Money<'a, Currency>, EngineError> {
        let deposit = self.store.deposit(key)?;
        let currency = deposit.amount().currency();

        let mut claimed = Money::from_minor(0, currency);

        for (_, claim) in self.store.claims_for_booking(key) {
            if let Some(resolution) = claim.resolution() {
                claimed = claimed.add(*resolution.paid_from_deposit()).map_err(EscrowError::from)?;
            }
        }

        Ok(escrow::refund(deposit.amount(), &claimed)?)
    }

    /// Derives the live countdown for a booking's rental window at `now`.
    ///
    /// # Errors
    ///
    /// Store and countdown failures as their wrapped variants.
    pub fn countdown(
        &self,
        key: BookingKey,
        now: DateTime<Utc>,
    ) -> Result<RentalCountdown, EngineError> {
        let booking = self.store.booking(key)?;
        let range = booking.range();

        let start = range.start().and_time(NaiveTime::MIN).and_utc();
        let end = range.end().and_time(NaiveTime::MIN).and_utc();

        Ok(RentalCountdown::evaluate(start, end, now)?)
    }

    /// Moves a still-held deposit to claimed when a resolution actually
    /// consumed part of it.
    fn consume_deposit(
        &mut self,
        booking: BookingKey,
        claim: &DamageClaim<'a>,
        mut deposit: Deposit<'a>,
    ) -> Result<(), EngineError> {
        let consumed = claim
            .resolution()
            .is_some_and(|resolution| resolution.paid_from_deposit().to_minor_units() > 0);

        if consumed && deposit.status() == crate::escrow::DepositStatus::Held {
            deposit.mark_claimed()?;
            self.store.put_deposit(booking, deposit);
        }

        Ok(())
    }
}
