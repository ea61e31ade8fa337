//! Store

use chrono::NaiveDate;
use slotmap::{SecondaryMap, SlotMap};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    availability::{self, Availability, AvailabilitySlot},
    booking::{BookingKey, BookingRequest},
    claims::{ClaimKey, ClaimStatus, DamageClaim},
    equipment::{Equipment, EquipmentKey},
    escrow::Deposit,
};

/// Errors raised at the record-store boundary.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    /// No equipment record under the given key.
    #[error("equipment not found: {0:?}")]
    EquipmentNotFound(EquipmentKey),

    /// No booking record under the given key.
    #[error("booking not found: {0:?}")]
    BookingNotFound(BookingKey),

    /// No deposit record attached to the given booking.
    #[error("no deposit recorded for booking {0:?}")]
    DepositNotFound(BookingKey),

    /// No claim record under the given key.
    #[error("claim not found: {0:?}")]
    ClaimNotFound(ClaimKey),

    /// A write carried a stale version precondition.
    #[error("version conflict: expected {expected}, found {found}")]
    VersionConflict {
        /// Version the writer read before mutating.
        expected: u64,
        /// Version currently stored.
        found: u64,
    },

    /// The check-then-insert found the requested dates taken.
    #[error("requested dates are no longer available")]
    Unavailable {
        /// The days that are taken or blocked.
        conflicting_dates: SmallVec<[NaiveDate; 8]>,
    },
}

/// The persistence boundary for the settlement engine.
///
/// [`RecordStore::insert_booking_if_available`] is the one operation that
/// must be atomic with respect to concurrent inserts on the same equipment;
/// a display-time availability verdict is advisory only.
pub trait RecordStore<'a> {
    /// Looks up an equipment record.
    ///
    /// # Errors
    ///
    /// [`StoreError::EquipmentNotFound`] if the key is absent.
    fn equipment(&self, key: EquipmentKey) -> Result<&Equipment<'a>, StoreError>;

    /// All bookings (any status) filed against the given equipment.
    fn bookings_for_equipment(
        &self,
        key: EquipmentKey,
    ) -> Vec<(BookingKey, &BookingRequest<'a>)>;

    /// Per-day overrides for the given equipment.
    fn slots_for_equipment(&self, key: EquipmentKey) -> &[AvailabilitySlot<'a>];

    /// Looks up a booking record.
    ///
    /// # Errors
    ///
    /// [`StoreError::BookingNotFound`] if the key is absent.
    fn booking(&self, key: BookingKey) -> Result<&BookingRequest<'a>, StoreError>;

    /// Re-checks availability and inserts the booking in one step, closing
    /// the window in which two renters could both see the dates as free.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] with the conflicting days if the range
    /// is taken at insert time; [`StoreError::EquipmentNotFound`] if the
    /// booking references unknown equipment.
    fn insert_booking_if_available(
        &mut self,
        booking: BookingRequest<'a>,
    ) -> Result<BookingKey, StoreError>;

    /// Replaces a booking record, guarded by the version the writer read.
    ///
    /// # Errors
    ///
    /// [`StoreError::VersionConflict`] if another writer got there first;
    /// [`StoreError::BookingNotFound`] if the key is absent.
    fn update_booking(
        &mut self,
        key: BookingKey,
        expected_version: u64,
        booking: BookingRequest<'a>,
    ) -> Result<(), StoreError>;

    /// Looks up the deposit attached to a booking.
    ///
    /// # Errors
    ///
    /// [`StoreError::DepositNotFound`] if no deposit was recorded.
    fn deposit(&self, booking: BookingKey) -> Result<&Deposit<'a>, StoreError>;

    /// Attaches or replaces the deposit record for a booking.
    fn put_deposit(&mut self, booking: BookingKey, deposit: Deposit<'a>);

    /// Looks up a claim record.
    ///
    /// # Errors
    ///
    /// [`StoreError::ClaimNotFound`] if the key is absent.
    fn claim(&self, key: ClaimKey) -> Result<&DamageClaim<'a>, StoreError>;

    /// Inserts a claim, returning its generated key.
    fn insert_claim(&mut self, claim: DamageClaim<'a>) -> ClaimKey;

    /// Replaces a claim record.
    ///
    /// # Errors
    ///
    /// [`StoreError::ClaimNotFound`] if the key is absent.
    fn update_claim(&mut self, key: ClaimKey, claim: DamageClaim<'a>) -> Result<(), StoreError>;

    /// All claims filed against the given booking.
    fn claims_for_booking(&self, booking: BookingKey) -> Vec<(ClaimKey, &DamageClaim<'a>)>;

    /// Keys of every claim still awaiting a renter response.
    fn pending_claims(&self) -> Vec<ClaimKey>;

    /// Number of open (pending, accepted or disputed) claims against the
    /// given booking. Drives the deposit release policy.
    fn open_claim_count(&self, booking: BookingKey) -> usize {
        self.claims_for_booking(booking)
            .iter()
            .filter(|(_, claim)| claim.status().is_open())
            .count()
    }
}

/// In-memory [`RecordStore`] backing demos and tests.
#[derive(Debug, Default)]
pub struct MemoryStore<'a> {
    equipment: SlotMap<EquipmentKey, Equipment<'a>>,
    bookings: SlotMap<BookingKey, BookingRequest<'a>>,
    slots: SecondaryMap<EquipmentKey, Vec<AvailabilitySlot<'a>>>,
    deposits: SecondaryMap<BookingKey, Deposit<'a>>,
    claims: SlotMap<ClaimKey, DamageClaim<'a>>,
}

impl<'a> MemoryStore<'a> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an equipment record, returning its generated key.
    pub fn add_equipment(&mut self, equipment: Equipment<'a>) -> EquipmentKey {
        self.equipment.insert(equipment)
    }

    /// Replaces the per-day overrides for an equipment item.
    pub fn set_slots(&mut self, key: EquipmentKey, slots: Vec<AvailabilitySlot<'a>>) {
        self.slots.insert(key, slots);
    }

    /// Number of equipment records held.
    #[must_use]
    pub fn equipment_count(&self) -> usize {
        self.equipment.len()
    }

    /// Number of booking records held.
    #[must_use]
    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }
}

impl<'a> RecordStore<'a> for MemoryStore<'a> {
    fn equipment(&self, key: EquipmentKey) -> Result<&Equipment<'a>, StoreError> {
        self.equipment
            .get(key)
            .ok_or(StoreError::EquipmentNotFound(key))
    }

    fn bookings_for_equipment(
        &self,
        key: EquipmentKey,
    ) -> Vec<(BookingKey, &BookingRequest<'a>)> {
        self.bookings
            .iter()
            .filter(|(_, booking)| booking.equipment() == key)
            .collect()
    }

    fn slots_for_equipment(&self, key: EquipmentKey) -> &[AvailabilitySlot<'a>] {
        self.slots.get(key).map_or(&[], Vec::as_slice)
    }

    fn booking(&self, key: BookingKey) -> Result<&BookingRequest<'a>, StoreError> {
        self.bookings.get(key).ok_or(StoreError::BookingNotFound(key))
    }

    fn insert_booking_if_available(
        &mut self,
        booking: BookingRequest<'a>,
    ) -> Result<BookingKey, StoreError> {
        let equipment = booking.equipment();

        if !self.equipment.contains_key(equipment) {
            return Err(StoreError::EquipmentNotFound(equipment));
        }

        let existing: Vec<&BookingRequest<'_>> = self
            .bookings
            .values()
            .filter(|existing| existing.equipment() == equipment)
            .collect();

        let slots = self.slots.get(equipment).map_or(&[][..], Vec::as_slice);

        match availability::resolve(booking.range(), &existing, slots) {
            Availability::Available => Ok(self.bookings.insert(booking)),
            Availability::Unavailable { conflicting_dates } => {
                Err(StoreError::Unavailable { conflicting_dates })
            }
        }
    }

    fn update_booking(
        &mut self,
        key: BookingKey,
        expected_version: u64,
        booking: BookingRequest<'a>,
    ) -> Result<(), StoreError> {
        let slot = self
            .bookings
            .get_mut(key)
            .ok_or(StoreError::BookingNotFound(key))?;

        if slot.version() != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                found: slot.version(),
            });
        }

        *slot = booking;

        Ok(())
    }

    fn deposit(&self, booking: BookingKey) -> Result<&Deposit<'a>, StoreError> {
        self.deposits
            .get(booking)
            .ok_or(StoreError::DepositNotFound(booking))
    }

    fn put_deposit(&mut self, booking: BookingKey, deposit: Deposit<'a>) {
        self.deposits.insert(booking, deposit);
    }

    fn claim(&self, key: ClaimKey) -> Result<&DamageClaim<'a>, StoreError> {
        self.claims.get(key).ok_or(StoreError::ClaimNotFound(key))
    }

    fn insert_claim(&mut self, claim: DamageClaim<'a>) -> ClaimKey {
        self.claims.insert(claim)
    }

    fn update_claim(&mut self, key: ClaimKey, claim: DamageClaim<'a>) -> Result<(), StoreError> {
        let slot = self.claims.get_mut(key).ok_or(StoreError::ClaimNotFound(key))?;

        *slot = claim;

        Ok(())
    }

    fn claims_for_booking(&self, booking: BookingKey) -> Vec<(ClaimKey, &DamageClaim<'a>)> {
        self.claims
            .iter()
            .filter(|(_, claim)| claim.booking() == booking)
            .collect()
    }

    fn pending_claims(&self) -> Vec<ClaimKey> {
        self.claims
            .iter()
            .filter(|(_, claim)| claim.status() == ClaimStatus::Pending)
            .map(|(key, _)| key)
            .collect()
    }
}
