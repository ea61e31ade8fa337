//! Settlement Example
//!
//! This example walks one booking through the full rental lifecycle: the
//! owner approves the request and takes the deposit into escrow, the rental
//! runs, the owner files a damage claim on return, the renter accepts it,
//! and the final settlement statement is printed.
//!
//! Use `-f` to load a fixture set by name
//!
//! Run with: `cargo run --example settlement`

use std::io;

use anyhow::Result;

use chrono::{NaiveDate, Utc};
use clap::Parser;
use gantry::{
    booking::{Actor, Party},
    claims::{RenterResponse, ResponseAction},
    fixtures::Fixture,
    statement::SettlementStatement,
    store::RecordStore,
    utils::DemoArgs,
};
use rusty_money::Money;

/// Settlement Example
#[expect(clippy::print_stdout, reason = "Example code")]
pub fn main() -> Result<()> {
    let args = DemoArgs::parse();

    let fixture = Fixture::from_set(&args.fixture)?;
    let currency = fixture
        .currency()
        .ok_or_else(|| anyhow::anyhow!("fixture set has no equipment"))?;

    let equipment_key = fixture.equipment_key("excavator")?;
    let booking_key = fixture.booking_key("excavator-june")?;

    let mut engine = fixture.into_engine();

    let owner = Actor::new(Party::Owner, "owner-1");
    let renter = Actor::new(Party::Renter, "renter-1");
    let now = Utc::now();

    // Owner approves; the deposit moves into escrow.
    engine.approve_booking(&owner, booking_key, now)?;

    // Pickup and return inspections both complete.
    engine.record_pickup(&owner, booking_key, true, now)?;
    engine.record_return(&owner, booking_key, true, now)?;

    // Countdown as it would have looked mid-rental.
    let mid_rental = NaiveDate::from_ymd_opt(2024, 6, 19)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("invalid demo instant"))?
        .and_utc();

    let countdown = engine.countdown(booking_key, mid_rental)?;

    println!(
        "Mid-rental: {} remaining, {}% elapsed ({:?})",
        countdown.remaining_label(),
        countdown.progress(),
        countdown.urgency(),
    );

    // Owner files a claim on return; the renter accepts it.
    let claim_key = engine.file_claim(
        &owner,
        booking_key,
        "Cracked hydraulic line",
        Money::from_minor(20_000, currency),
        now,
    )?;

    engine.respond_to_claim(
        &renter,
        claim_key,
        RenterResponse {
            action: ResponseAction::Accept,
            notes: None,
            counter_offer: None,
            responded_at: now,
        },
        now,
    )?;

    // Assemble and print the settlement statement.
    let store = engine.store();
    let booking = store.booking(booking_key)?;
    let equipment = store.equipment(equipment_key)?;
    let deposit = store.deposit(booking_key)?;

    let quote = engine.quote_rental(equipment_key, booking.range())?;

    let claims: Vec<_> = store
        .claims_for_booking(booking_key)
        .into_iter()
        .map(|(_, claim)| claim)
        .collect();

    let statement = SettlementStatement::from_records(equipment, booking, &quote, deposit, &claims)?;

    let stdout = io::stdout();
    let handle = stdout.lock();

    statement.write_to(handle)?;

    Ok(())
}
