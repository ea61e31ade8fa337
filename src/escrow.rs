//! Escrow

use chrono::{DateTime, Utc};
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

/// Reason strings surfaced to callers when a release is refused. These are
/// display text, shown to the owner verbatim.
pub mod reason {
    /// The payment record holds no deposit.
    pub const NO_DEPOSIT: &str = "No deposit to release";

    /// The deposit has already left the held state.
    pub const ALREADY_PROCESSED: &str = "Deposit already processed";

    /// The return inspection has not been recorded yet.
    pub const INSPECTION_PENDING: &str = "Return inspection not completed";

    /// At least one damage claim is still open.
    pub const PENDING_CLAIMS: &str = "Pending damage claims exist";
}

/// Errors raised by deposit escrow operations.
#[derive(Debug, Error, PartialEq)]
pub enum EscrowError {
    /// A release precondition is unmet; the reason is display text.
    #[error("{0}")]
    Policy(&'static str),

    /// The deposit status may only move forward out of `Held`.
    #[error("deposit cannot move from {from:?} to {to:?}")]
    IllegalTransition {
        /// Current deposit status.
        from: DepositStatus,
        /// Requested deposit status.
        to: DepositStatus,
    },

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Lifecycle of a held security deposit.
///
/// Transitions only run forward along `Held -> Released | Claimed |
/// Refunded`; a deposit never re-enters `Held`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositStatus {
    /// No deposit was taken for this booking.
    None,

    /// Held in escrow for the duration of the rental.
    Held,

    /// Returned in full to the renter.
    Released,

    /// Consumed (fully or partially) by a damage claim.
    Claimed,

    /// Returned outside the normal release path.
    Refunded,
}

impl DepositStatus {
    /// Forward-only transition table.
    #[must_use]
    pub fn can_transition(self, to: DepositStatus) -> bool {
        matches!(
            (self, to),
            (
                DepositStatus::Held,
                DepositStatus::Released | DepositStatus::Claimed | DepositStatus::Refunded
            )
        )
    }
}

/// A security deposit attached to a booking's payment record.
#[derive(Debug, Clone)]
pub struct Deposit<'a> {
    amount: Money<'a, Currency>,
    status: DepositStatus,
    released_at: Option<DateTime<Utc>>,
}

impl<'a> Deposit<'a> {
    /// Creates a deposit held in escrow.
    #[must_use]
    pub fn held(amount: Money<'a, Currency>) -> Self {
        let status = if amount.to_minor_units() > 0 {
            DepositStatus::Held
        } else {
            DepositStatus::None
        };

        Deposit {
            amount,
            status,
            released_at: None,
        }
    }

    /// Amount held.
    #[must_use]
    pub fn amount(&self) -> &Money<'a, Currency> {
        &self.amount
    }

    /// Current escrow status.
    #[must_use]
    pub fn status(&self) -> DepositStatus {
        self.status
    }

    /// When the deposit was released, if it has been.
    #[must_use]
    pub fn released_at(&self) -> Option<DateTime<Utc>> {
        self.released_at
    }

    /// Checks every release precondition without changing state.
    ///
    /// Fails closed: any unmet condition refuses the release with a
    /// display-ready reason.
    ///
    /// # Errors
    ///
    /// [`EscrowError::Policy`] with the first failing reason, checked in
    /// order: no deposit, already processed, inspection pending, open
    /// claims.
    pub fn release_check(
        &self,
        return_inspection_completed: bool,
        pending_claims: usize,
    ) -> Result<(), EscrowError> {
        if self.status == DepositStatus::None || self.amount.to_minor_units() <= 0 {
            return Err(EscrowError::Policy(reason::NO_DEPOSIT));
        }

        if self.status != DepositStatus::Held {
            return Err(EscrowError::Policy(reason::ALREADY_PROCESSED));
        }

        if !return_inspection_completed {
            return Err(EscrowError::Policy(reason::INSPECTION_PENDING));
        }

        if pending_claims > 0 {
            return Err(EscrowError::Policy(reason::PENDING_CLAIMS));
        }

        Ok(())
    }

    /// Releases the deposit back to the renter.
    ///
    /// # Errors
    ///
    /// Any [`EscrowError::Policy`] surfaced by [`Deposit::release_check`].
    pub fn release(
        &mut self,
        return_inspection_completed: bool,
        pending_claims: usize,
        now: DateTime<Utc>,
    ) -> Result<(), EscrowError> {
        self.release_check(return_inspection_completed, pending_claims)?;

        self.status = DepositStatus::Released;
        self.released_at = Some(now);

        Ok(())
    }

    /// Marks the deposit as consumed by a resolved claim.
    ///
    /// # Errors
    ///
    /// [`EscrowError::IllegalTransition`] unless the deposit is held.
    pub fn mark_claimed(&mut self) -> Result<(), EscrowError> {
        self.transition(DepositStatus::Claimed)
    }

    /// Marks the deposit as refunded outside the normal release path.
    ///
    /// # Errors
    ///
    /// [`EscrowError::IllegalTransition`] unless the deposit is held.
    pub fn mark_refunded(&mut self, now: DateTime<Utc>) -> Result<(), EscrowError> {
        self.transition(DepositStatus::Refunded)?;
        self.released_at = Some(now);

        Ok(())
    }

    fn transition(&mut self, to: DepositStatus) -> Result<(), EscrowError> {
        if !self.status.can_transition(to) {
            return Err(EscrowError::IllegalTransition {
                from: self.status,
                to,
            });
        }

        self.status = to;

        Ok(())
    }
}

/// Refund owed to the renter after claim deductions: `max(0, deposit -
/// claimed)`.
///
/// The refund is clamped at zero even when the claim exceeds the deposit;
/// the excess becomes an additional charge during claim resolution, not a
/// negative refund here.
///
/// # Errors
///
/// Returns a [`MoneyError`] via [`EscrowError::Money`] when the two amounts
/// are in different currencies.
pub fn refund<'a>(
    deposit: &Money<'a, Currency>,
    claimed: &Money<'a, Currency>,
) -> Result<Money<'a, Currency>, EscrowError> {
    if deposit.currency() != claimed.currency() {
        return Err(EscrowError::Money(MoneyError::CurrencyMismatch {
            expected: deposit.currency().iso_alpha_code,
            actual: claimed.currency().iso_alpha_code,
        }));
    }

    let remaining = (deposit.to_minor_units() - claimed.to_minor_units()).max(0);

    Ok(Money::from_minor(remaining, deposit.currency()))
}
