//! # medistock-core: Pricing, Scheme and Batch-Inventory Engine
//!
//! The business rules of a pharmaceutical distributor's back office, as pure
//! functions over value types. No I/O of any kind.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MediStock Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Back-office UI (forms, tables, reports)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          medistock-db: LedgerService + LedgerStore              │   │
//! │  │      load collections ──► Books ──► save touched collections    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ medistock-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌───────────────┐   │   │
//! │  │   │ pricing  │ │  scheme  │ │ allocation │ │   inventory   │   │   │
//! │  │   │ margin   │ │  drafts  │ │   (FEFO)   │ │    credit     │   │   │
//! │  │   └──────────┘ └──────────┘ └────────────┘ └───────────────┘   │   │
//! │  │                      ledger (transactions)                      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Records (Product, Customer, InventoryBatch, Sale, ...)
//! - [`money`] - Integer paise arithmetic with half-up rounding
//! - [`margin`] / [`pricing`] - Margin resolution and selling-price suggestion
//! - [`scheme`] - Supplier scheme evaluation
//! - [`drafts`] - Operator input, including scheme selection per line
//! - [`allocation`] - FEFO batch candidates and expiry bands
//! - [`inventory`] - Batch quantity movements and stock views
//! - [`credit`] - Credit limit, outstanding balance, payment settlement
//! - [`ledger`] - All-or-nothing transactions over [`ledger::Books`]
//! - [`lookup`] - "Unknown" display fallbacks, invoice numbering
//! - [`validation`] / [`error`] - Field rules and typed rejections
//!
//! ## Example Usage
//!
//! ```rust
//! use medistock_core::money::Money;
//! use medistock_core::pricing::calculate_price;
//! use medistock_core::types::Percent;
//!
//! // ₹90.90 at 10% margin
//! let quote = calculate_price(Money::from_paise(9090), Percent::whole(10), None);
//! assert_eq!(quote.price, Money::from_paise(9999));
//! assert_eq!(quote.price.to_string(), "₹99.99");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod credit;
pub mod drafts;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod lookup;
pub mod margin;
pub mod money;
pub mod pricing;
pub mod scheme;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{Books, LedgerSettings};
pub use money::Money;
pub use types::*;
