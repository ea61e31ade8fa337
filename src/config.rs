//! Config

use chrono::Duration;
use decimal_percentage::Percentage;
use rusty_money::{Money, iso::Currency};

/// Marketplace-wide settlement policy knobs.
///
/// Values are typed here; the fixture layer parses them from YAML strings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Marketplace fee applied to every rental subtotal.
    pub fee_rate: Percentage,

    /// Per-claim insurance coverage limit in minor units. Zero means the
    /// marketplace carries no insurance.
    pub insurance_coverage_minor: i64,

    /// Hours a renter has to answer a damage claim before it is escalated
    /// automatically.
    pub response_window_hours: i64,
}

impl EngineConfig {
    /// The renter response window as a duration.
    #[must_use]
    pub fn response_window(&self) -> Duration {
        Duration::hours(self.response_window_hours)
    }

    /// The insurance coverage limit as money in `currency`.
    #[must_use]
    pub fn insurance_coverage<'a>(&self, currency: &'a Currency) -> Money<'a, Currency> {
        Money::from_minor(self.insurance_coverage_minor, currency)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            fee_rate: Percentage::from(0.05),
            insurance_coverage_minor: 0,
            response_window_hours: 72,
        }
    }
}
