//! Gantry
//!
//! Gantry is a booking lifecycle and financial settlement engine for an equipment-rental marketplace: pricing, availability, booking and claim state machines, deposit escrow and settlement statements.

pub mod availability;
pub mod booking;
pub mod calendar;
pub mod claims;
pub mod config;
pub mod countdown;
pub mod engine;
pub mod equipment;
pub mod escrow;
pub mod fixtures;
pub mod prelude;
pub mod pricing;
pub mod statement;
pub mod store;
pub mod utils;
