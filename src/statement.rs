//! Statement

use std::io;

use rusty_money::{Money, MoneyError, iso::Currency};
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    booking::BookingRequest,
    claims::DamageClaim,
    equipment::Equipment,
    escrow::{self, Deposit},
    pricing::Quote,
};

/// Errors that can occur when building or rendering a statement.
#[derive(Debug, Error)]
pub enum StatementError {
    /// Wrapper for money errors.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Escrow arithmetic failed.
    #[error(transparent)]
    Escrow(#[from] crate::escrow::EscrowError),

    /// IO error
    #[error("IO error")]
    IO,
}

/// One resolved claim's contribution to the statement.
#[derive(Debug, Clone)]
struct ClaimLine<'a> {
    description: String,
    final_amount: Money<'a, Currency>,
    paid_from_deposit: Money<'a, Currency>,
    paid_from_insurance: Money<'a, Currency>,
    additional_charge: Money<'a, Currency>,
}

/// Final settlement statement for a completed rental: the priced rental,
/// the deposit, every resolved claim's split, and the refund due.
#[derive(Debug, Clone)]
pub struct SettlementStatement<'a> {
    equipment_name: String,
    renter: String,
    days: i64,
    subtotal: Money<'a, Currency>,
    fees: Money<'a, Currency>,
    rental_total: Money<'a, Currency>,
    deposit: Money<'a, Currency>,
    claims: Vec<ClaimLine<'a>>,
    refund: Money<'a, Currency>,
}

impl<'a> SettlementStatement<'a> {
    /// Assembles a statement from the settled records of one booking.
    ///
    /// Unresolved claims contribute nothing; the refund reflects only
    /// resolutions that actually consumed the deposit.
    ///
    /// # Errors
    ///
    /// Returns a [`StatementError`] if the deposit arithmetic fails.
    pub fn from_records(
        equipment: &Equipment<'a>,
        booking: &BookingRequest<'a>,
        quote: &Quote<'a>,
        deposit: &Deposit<'a>,
        claims: &[&DamageClaim<'a>],
    ) -> Result<Self, StatementError> {
        let currency = deposit.amount().currency();

        let mut claim_lines = Vec::new();
        let mut claimed = Money::from_minor(0, currency);

        for claim in claims {
            let Some(resolution) = claim.resolution() else {
                continue;
            };

            claimed = claimed.add(*resolution.paid_from_deposit())?;

            claim_lines.push(ClaimLine {
                description: claim.description().to_string(),
                final_amount: *resolution.final_amount(),
                paid_from_deposit: *resolution.paid_from_deposit(),
                paid_from_insurance: *resolution.paid_from_insurance(),
                additional_charge: *resolution.additional_charge(),
            });
        }

        let refund = escrow::refund(deposit.amount(), &claimed)?;

        Ok(SettlementStatement {
            equipment_name: equipment.name.clone(),
            renter: booking.renter().to_string(),
            days: quote.days(),
            subtotal: *quote.subtotal(),
            fees: *quote.fees(),
            rental_total: *quote.total(),
            deposit: *deposit.amount(),
            claims: claim_lines,
            refund,
        })
    }

    /// The refund owed to the renter.
    #[must_use]
    pub fn refund(&self) -> &Money<'a, Currency> {
        &self.refund
    }

    /// The rental total the renter paid.
    #[must_use]
    pub fn rental_total(&self) -> &Money<'a, Currency> {
        &self.rental_total
    }

    /// Renders the statement as a table followed by the refund summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), StatementError> {
        let mut builder = Builder::default();

        builder.push_record(["Item", "Amount"]);

        builder.push_record([
            format!("Rental: {} ({} days)", self.equipment_name, self.days),
            format!("{}", self.subtotal),
        ]);

        builder.push_record(["Marketplace fee".to_string(), format!("{}", self.fees)]);

        builder.push_record([
            "Rental total".to_string(),
            format!("{}", self.rental_total),
        ]);

        builder.push_record(["Deposit held".to_string(), format!("{}", self.deposit)]);

        for line in &self.claims {
            builder.push_record([
                format!("Claim: {}", line.description),
                format!("{}", line.final_amount),
            ]);

            builder.push_record([
                "  from deposit".to_string(),
                format!("-{}", line.paid_from_deposit),
            ]);

            if line.paid_from_insurance.to_minor_units() > 0 {
                builder.push_record([
                    "  from insurance".to_string(),
                    format!("-{}", line.paid_from_insurance),
                ]);
            }

            if line.additional_charge.to_minor_units() > 0 {
                builder.push_record([
                    "  charged to renter".to_string(),
                    format!("{}", line.additional_charge),
                ]);
            }
        }

        builder.push_record(["Deposit refund".to_string(), format!("{}", self.refund)]);

        let mut table = builder.build();
        let mut theme = Theme::from(Style::modern_rounded());
        let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

        theme.remove_horizontal_lines();
        theme.insert_horizontal_line(1, separator);

        table.with(theme);
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Columns::new(1..), Alignment::right());

        writeln!(out, "\n{table}").map_err(|_err| StatementError::IO)?;

        writeln!(out, " Renter: {}", self.renter).map_err(|_err| StatementError::IO)?;
        writeln!(out, " Refund due: {}", self.refund).map_err(|_err| StatementError::IO)
    }
}
