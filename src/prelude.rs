//! Gantry prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    availability::{Availability, AvailabilitySlot, resolve},
    booking::{Actor, BookingError, BookingKey, BookingRequest, BookingStatus, Party},
    calendar::{CalendarError, DateRange},
    claims::{
        ClaimError, ClaimKey, ClaimResolution, ClaimStatus, DamageClaim, RenterResponse,
        ResponseAction,
    },
    config::EngineConfig,
    countdown::{CountdownError, RentalCountdown, Urgency},
    engine::{Engine, EngineError},
    equipment::{Equipment, EquipmentKey},
    escrow::{Deposit, DepositStatus, EscrowError, refund},
    fixtures::{Fixture, FixtureError},
    pricing::{PricingError, Quote, quote},
    statement::{SettlementStatement, StatementError},
    store::{MemoryStore, RecordStore, StoreError},
};
