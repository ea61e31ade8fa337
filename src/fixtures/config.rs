//! Config Fixtures

use serde::Deserialize;

use crate::{
    config::EngineConfig,
    fixtures::{
        FixtureError,
        equipment::{parse_percentage, parse_price},
    },
};

/// Engine configuration in YAML, with human-friendly string values.
#[derive(Debug, Deserialize)]
pub struct ConfigFixture {
    /// Marketplace fee rate (e.g., "5%")
    pub fee_rate: Option<String>,

    /// Per-claim insurance coverage limit (e.g., "100.00 USD")
    pub insurance_coverage: Option<String>,

    /// Renter response window in hours
    pub response_window_hours: Option<i64>,
}

impl TryFrom<ConfigFixture> for EngineConfig {
    type Error = FixtureError;

    fn try_from(fixture: ConfigFixture) -> Result<Self, Self::Error> {
        let mut config = EngineConfig::default();

        if let Some(rate) = fixture.fee_rate {
            config.fee_rate = parse_percentage(&rate)?;
        }

        if let Some(coverage) = fixture.insurance_coverage {
            let (minor, _currency) = parse_price(&coverage)?;

            config.insurance_coverage_minor = minor;
        }

        if let Some(hours) = fixture.response_window_hours {
            config.response_window_hours = hours;
        }

        Ok(config)
    }
}
