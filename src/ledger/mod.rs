//! Billing service layer over the pure [`core`](crate::core) engine.
//!
//! Mutations on one invoice are serialized by a per-invoice lock and
//! committed to a [`Store`] with an optimistic version check. Invoice and
//! payment (or credit note) changes land in a single [`ChangeSet`], and the
//! injected [`Cache`] is evicted once the commit succeeds.

mod cache;
pub mod config;
mod locks;
mod numbering;
mod recurring;
mod relance;
mod requests;
mod service;
mod store;
mod sweeps;
pub mod telemetry;

pub use cache::*;
pub use config::LedgerConfig;
pub use locks::*;
pub use numbering::*;
pub use recurring::*;
pub use relance::*;
pub use requests::*;
pub use service::*;
pub use store::*;
pub use sweeps::*;
