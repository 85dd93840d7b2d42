//! # facturation
//!
//! Invoice financial state engine for an ERP back office: totals
//! (HT / TVA / TTC), payment reconciliation, credit notes (avoirs), quotes,
//! numbering, reporting aggregates and the service layer that keeps them
//! consistent.
//!
//! All monetary values are [`Money`](crate::core::Money), a
//! [`rust_decimal::Decimal`] rounded half-up to two places, never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use facturation::core::*;
//! use rust_decimal_macros::dec;
//!
//! let invoice = InvoiceBuilder::new("FAC-2024-0001", NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
//!     .due_date(NaiveDate::from_ymd_opt(2024, 7, 15).unwrap())
//!     .default_tax(Tax::vat(dec!(20)).unwrap())
//!     .add_line(LineItemBuilder::new("1", "Conseil", 3, Money::new(dec!(100))).build())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(invoice.totals.amount_ttc, Money::new(dec!(360)));
//! assert_eq!(invoice.amount_remaining, Money::new(dec!(360)));
//! assert_eq!(invoice.status, InvoiceStatus::Draft);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Money, taxes, totals, state machine, reconciliation, credit notes, quotes, numbering, statistics |
//! | `ledger` | Service layer: store, per-invoice locks, cache, sweeps, configuration, logging |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "ledger")]
pub mod ledger;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
