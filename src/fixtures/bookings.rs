//! Booking Fixtures

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Wrapper for bookings in YAML
#[derive(Debug, Deserialize)]
pub struct BookingsFixture {
    /// Map of booking key -> booking fixture
    pub bookings: FxHashMap<String, BookingFixture>,
}

/// Booking Fixture
///
/// The stored total is not part of the fixture; it is stamped from the
/// pricing calculator when the booking is inserted.
#[derive(Debug, Deserialize)]
pub struct BookingFixture {
    /// Equipment key the booking is filed against
    pub equipment: String,

    /// Identity of the renting party
    pub renter: String,

    /// First rental day (inclusive)
    pub start: NaiveDate,

    /// Day the equipment is returned (exclusive)
    pub end: NaiveDate,

    /// Optional message from the renter
    pub message: Option<String>,
}
