//! Slot Fixtures

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use rusty_money::Money;
use serde::Deserialize;

use crate::{
    availability::AvailabilitySlot,
    fixtures::{FixtureError, equipment::parse_price},
};

/// Wrapper for per-day overrides in YAML
#[derive(Debug, Deserialize)]
pub struct SlotsFixture {
    /// Map of equipment key -> override list
    pub slots: FxHashMap<String, Vec<SlotFixture>>,
}

/// Slot Fixture
#[derive(Debug, Deserialize)]
pub struct SlotFixture {
    /// Day the override applies to
    pub date: NaiveDate,

    /// Whether the day is blocked from booking
    #[serde(default)]
    pub blocked: bool,

    /// Optional custom rate for the day (e.g., "150.00 USD")
    pub rate: Option<String>,
}

impl TryFrom<SlotFixture> for AvailabilitySlot<'_> {
    type Error = FixtureError;

    fn try_from(fixture: SlotFixture) -> Result<Self, Self::Error> {
        let custom_rate = match fixture.rate {
            Some(price) => {
                let (minor, currency) = parse_price(&price)?;

                Some(Money::from_minor(minor, currency))
            }
            None => None,
        };

        Ok(AvailabilitySlot {
            date: fixture.date,
            is_available: !fixture.blocked,
            custom_rate,
        })
    }
}
