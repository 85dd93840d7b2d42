//! Core invoice types, arithmetic, lifecycle and reporting.
//!
//! Everything in this module is pure and synchronous: no I/O, no shared
//! mutable state. The [`ledger`](crate) service layer builds on it.

mod builder;
mod calculation;
mod credit_note;
pub mod currencies;
mod error;
mod money;
mod numbering;
mod quote;
mod reconcile;
mod state;
pub mod stats;
mod tax;
mod types;
mod validation;

pub use builder::*;
pub use calculation::*;
pub use credit_note::*;
pub use currencies::is_known_currency_code;
pub use error::*;
pub use money::*;
pub use numbering::*;
pub use quote::*;
pub use reconcile::*;
pub use state::*;
pub use tax::*;
pub use types::*;
pub use validation::*;
