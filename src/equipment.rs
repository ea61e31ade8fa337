//! Equipment

use rusty_money::{Money, iso::Currency};
use slotmap::new_key_type;

new_key_type! {
    /// Equipment Key
    pub struct EquipmentKey;
}

/// An equipment item offered for rent.
#[derive(Debug, Clone)]
pub struct Equipment<'a> {
    /// Display name.
    pub name: String,

    /// Identity of the owning party.
    pub owner: String,

    /// Base daily rental rate.
    pub daily_rate: Money<'a, Currency>,

    /// Security deposit held for the duration of a rental.
    pub deposit: Money<'a, Currency>,
}
