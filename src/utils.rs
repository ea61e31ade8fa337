//! Utils

use clap::Parser;

/// Arguments for the settlement demo
#[derive(Debug, Parser)]
pub struct DemoArgs {
    /// Fixture set to load equipment, slots and bookings from
    #[clap(short, long, default_value = "standard")]
    pub fixture: String,

    /// Output file path
    #[clap(short, long)]
    pub out: Option<String>,
}
