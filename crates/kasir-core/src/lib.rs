//! # kasir-core: Pure Business Logic for Kasir POS
//!
//! Everything both sides of the wire must agree on lives here: entity types,
//! the checkout arithmetic, input validation, the transaction status state
//! machine, the payment notification signature and the sync batch format.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir POS Architecture                           │
//! │                                                                         │
//! │  ┌──────────────────────┐              ┌──────────────────────────┐    │
//! │  │  kasir-sync (client) │──POST /sync─►│   kasir-api (server)     │    │
//! │  │  offline queue       │              │   checkout, catalog,     │    │
//! │  │  reconciler          │◄─GET /products│  payments webhook       │    │
//! │  └──────────┬───────────┘              └────────────┬─────────────┘    │
//! │             │                                       │                   │
//! │  ┌──────────▼───────────────────────────────────────▼─────────────┐    │
//! │  │               ★ kasir-core (THIS CRATE) ★                       │    │
//! │  │                                                                 │    │
//! │  │   types  money  checkout  sync  payment  report  validation     │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                    kasir-db (Database Layer)                    │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Product, Transaction, Category, ...)
//! - [`money`] - Integer rupiah amounts
//! - [`checkout`] - Cart request, totals and stock checks
//! - [`sync`] - Offline batch request and per-item report
//! - [`payment`] - Gateway notification signature and status mapping
//! - [`report`] - Report kinds and period boundaries
//! - [`envelope`] - `{success, data | error}` response wrapper
//! - [`validation`] - Field rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use kasir_core::checkout::{CheckoutItem, CheckoutRequest};
//! use kasir_core::{Money, PaymentMethod};
//!
//! let request = CheckoutRequest {
//!     payment_method: PaymentMethod::Cash,
//!     items: vec![CheckoutItem {
//!         product_id: "p1".to_string(),
//!         quantity: 2,
//!         price_at_record: Money::from_rupiah(24_000),
//!     }],
//! };
//!
//! assert!(request.validate().is_ok());
//! assert_eq!(request.total_amount(), Ok(Money::from_rupiah(48_000)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod envelope;
pub mod error;
pub mod money;
pub mod payment;
pub mod report;
pub mod sync;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of rows returned by the top-products report.
pub const TOP_PRODUCTS_LIMIT: i64 = 5;

/// Attempts after which an offline transaction stops being retried.
///
/// Only item-level rejections from the server count as attempts; a batch
/// that never reached the server leaves the counter alone.
pub const MAX_RETRY_ATTEMPTS: i64 = 10;
