//! Fixtures

use std::{fs, path::PathBuf};

use chrono::Utc;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::{
    availability::AvailabilitySlot,
    booking::{BookingKey, BookingRequest},
    calendar::{CalendarError, DateRange},
    config::EngineConfig,
    engine::Engine,
    equipment::{Equipment, EquipmentKey},
    fixtures::{
        bookings::BookingsFixture, config::ConfigFixture, equipment::EquipmentFixtureSet,
        slots::SlotsFixture,
    },
    pricing::{self, PricingError},
    store::{MemoryStore, RecordStore, StoreError},
};

pub mod bookings;
pub mod config;
pub mod equipment;
pub mod slots;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Equipment not found
    #[error("Equipment not found: {0}")]
    EquipmentNotFound(String),

    /// Booking not found
    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    /// Currency mismatch between records
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// Invalid booking date range
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// Booking could not be priced
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Record store rejected an insert
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fixture
///
/// Loads a named scenario set (`equipment`, `slots`, `config`, `bookings`
/// YAML files sharing one name) into a [`MemoryStore`], keeping the string
/// keys so tests can refer to records by name.
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    /// The store being populated
    store: MemoryStore<'static>,

    /// String key -> generated key mappings for lookups
    equipment_keys: FxHashMap<String, EquipmentKey>,
    booking_keys: FxHashMap<String, BookingKey>,

    /// Engine configuration for the set
    config: EngineConfig,

    /// Currency for the fixture set
    currency: Option<&'static rusty_money::iso::Currency>,
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            store: MemoryStore::new(),
            equipment_keys: FxHashMap::default(),
            booking_keys: FxHashMap::default(),
            config: EngineConfig::default(),
            currency: None,
        }
    }

    /// Load equipment from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or if there are
    /// currency mismatches.
    pub fn load_equipment(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("equipment").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: EquipmentFixtureSet = serde_norway::from_str(&contents)?;

        for (key, equipment_fixture) in fixture.equipment {
            let record: Equipment<'static> = equipment_fixture.try_into()?;
            let currency = record.daily_rate.currency();

            if let Some(existing) = self.currency {
                if existing != currency {
                    return Err(FixtureError::CurrencyMismatch(
                        existing.iso_alpha_code.to_string(),
                        currency.iso_alpha_code.to_string(),
                    ));
                }
            } else {
                self.currency = Some(currency);
            }

            let equipment_key = self.store.add_equipment(record);

            self.equipment_keys.insert(key, equipment_key);
        }

        Ok(self)
    }

    /// Load per-day overrides from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or if referenced
    /// equipment doesn't exist.
    pub fn load_slots(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("slots").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: SlotsFixture = serde_norway::from_str(&contents)?;

        for (equipment_key_str, slot_fixtures) in fixture.slots {
            let equipment_key = self
                .equipment_keys
                .get(&equipment_key_str)
                .copied()
                .ok_or_else(|| FixtureError::EquipmentNotFound(equipment_key_str.clone()))?;

            let slots = slot_fixtures
                .into_iter()
                .map(AvailabilitySlot::try_from)
                .collect::<Result<Vec<_>, _>>()?;

            self.store.set_slots(equipment_key, slots);
        }

        Ok(self)
    }

    /// Load the engine configuration from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_config(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("config").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: ConfigFixture = serde_norway::from_str(&contents)?;

        self.config = fixture.try_into()?;

        Ok(self)
    }

    /// Load bookings from a YAML fixture file, pricing each one and
    /// inserting it through the availability check
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if referenced
    /// equipment doesn't exist, or if a booking's dates are taken.
    pub fn load_bookings(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("bookings").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: BookingsFixture = serde_norway::from_str(&contents)?;

        for (key, booking_fixture) in fixture.bookings {
            let equipment_key = self
                .equipment_keys
                .get(&booking_fixture.equipment)
                .copied()
                .ok_or_else(|| {
                    FixtureError::EquipmentNotFound(booking_fixture.equipment.clone())
                })?;

            let range = DateRange::new(booking_fixture.start, booking_fixture.end)?;

            let daily_rate = self.store.equipment(equipment_key)?.daily_rate;

            let quote = pricing::quote(
                &daily_rate,
                &range,
                self.config.fee_rate,
                self.store.slots_for_equipment(equipment_key),
            )?;

            let booking = BookingRequest::new(
                equipment_key,
                booking_fixture.renter,
                range,
                *quote.total(),
                booking_fixture.message,
                Utc::now(),
            );

            let booking_key = self.store.insert_booking_if_available(booking)?;

            self.booking_keys.insert(key, booking_key);
        }

        Ok(self)
    }

    /// Load a complete fixture set (equipment, slots, config, and bookings
    /// with the same name)
    ///
    /// The config file is optional; the others are required.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::new();

        fixture.load_equipment(name)?.load_slots(name)?;

        if fixture
            .base_path
            .join("config")
            .join(format!("{name}.yml"))
            .exists()
        {
            fixture.load_config(name)?;
        }

        fixture.load_bookings(name)?;

        Ok(fixture)
    }

    /// Get an equipment key by its string key
    ///
    /// # Errors
    ///
    /// Returns an error if the equipment is not found.
    pub fn equipment_key(&self, key: &str) -> Result<EquipmentKey, FixtureError> {
        self.equipment_keys
            .get(key)
            .copied()
            .ok_or_else(|| FixtureError::EquipmentNotFound(key.to_string()))
    }

    /// Get a booking key by its string key
    ///
    /// # Errors
    ///
    /// Returns an error if the booking is not found.
    pub fn booking_key(&self, key: &str) -> Result<BookingKey, FixtureError> {
        self.booking_keys
            .get(key)
            .copied()
            .ok_or_else(|| FixtureError::BookingNotFound(key.to_string()))
    }

    /// The engine configuration loaded for the set
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The currency of the fixture set, if any equipment was loaded
    #[must_use]
    pub fn currency(&self) -> Option<&'static rusty_money::iso::Currency> {
        self.currency
    }

    /// Read access to the populated store
    pub fn store(&self) -> &MemoryStore<'static> {
        &self.store
    }

    /// Consume the fixture into an engine over the populated store
    #[must_use]
    pub fn into_engine(self) -> Engine<'static, MemoryStore<'static>> {
        Engine::new(self.config, self.store)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{env, fs, path::Path};

    use decimal_percentage::Percentage;
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::booking::BookingStatus;

    use super::*;

    fn write_fixture(base: &Path, category: &str, name: &str, contents: &str) -> TestResult {
        let dir = base.join(category);

        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{name}.yml")), contents)?;

        Ok(())
    }

    #[test]
    fn fixture_from_set_loads_the_standard_scenario() -> TestResult {
        let fixture = Fixture::from_set("standard")?;

        assert_eq!(fixture.store().equipment_count(), 2);
        assert_eq!(fixture.store().booking_count(), 1);
        assert_eq!(fixture.currency(), Some(USD));
        assert_eq!(fixture.config().fee_rate, Percentage::from(0.05));

        Ok(())
    }

    #[test]
    fn loaded_bookings_carry_stamped_totals() -> TestResult {
        let fixture = Fixture::from_set("standard")?;
        let booking_key = fixture.booking_key("excavator-june")?;
        let booking = fixture.store().booking(booking_key)?;

        // 5 days at 100.00 plus the 5% fee
        assert_eq!(booking.total().to_minor_units(), 52_500);
        assert_eq!(booking.status(), BookingStatus::Pending);

        Ok(())
    }

    #[test]
    fn unknown_keys_surface_typed_errors() -> TestResult {
        let fixture = Fixture::from_set("standard")?;

        assert!(matches!(
            fixture.equipment_key("nonexistent"),
            Err(FixtureError::EquipmentNotFound(_))
        ));
        assert!(matches!(
            fixture.booking_key("nonexistent"),
            Err(FixtureError::BookingNotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn fixture_load_equipment_rejects_currency_mismatch() -> TestResult {
        let unique = format!(
            "gantry-fixtures-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)?
                .as_nanos()
        );

        let base_path = env::temp_dir().join(unique);

        write_fixture(
            &base_path,
            "equipment",
            "usd_set",
            "equipment:\n  excavator:\n    name: Excavator\n    owner: owner-1\n    daily_rate: 100.00 USD\n    deposit: 300.00 USD\n",
        )?;

        write_fixture(
            &base_path,
            "equipment",
            "gbp_set",
            "equipment:\n  scaffold:\n    name: Scaffold\n    owner: owner-2\n    daily_rate: 40.00 GBP\n    deposit: 100.00 GBP\n",
        )?;

        let mut fixture = Fixture::with_base_path(&base_path);

        fixture.load_equipment("usd_set")?;

        let result = fixture.load_equipment("gbp_set");

        assert!(matches!(result, Err(FixtureError::CurrencyMismatch(_, _))));

        Ok(())
    }

    #[test]
    fn slots_for_unknown_equipment_are_rejected() -> TestResult {
        let unique = format!(
            "gantry-slots-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)?
                .as_nanos()
        );

        let base_path = env::temp_dir().join(unique);

        write_fixture(
            &base_path,
            "slots",
            "orphan",
            "slots:\n  missing:\n    - date: 2024-06-16\n      blocked: true\n",
        )?;

        let mut fixture = Fixture::with_base_path(&base_path);

        let result = fixture.load_slots("orphan");

        assert!(matches!(result, Err(FixtureError::EquipmentNotFound(_))));

        Ok(())
    }

    #[test]
    fn fixture_default_matches_new() {
        let fixture = Fixture::default();

        assert_eq!(fixture.base_path, PathBuf::from("./fixtures"));
        assert!(fixture.equipment_keys.is_empty());
        assert!(fixture.booking_keys.is_empty());
    }
}
