//! # Domain Types
//!
//! Core domain types used throughout Kasir POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │◄──│    Product      │◄──│ TransactionItem │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  quantity       │       │
//! │  │  name (unique)  │   │  sku (unique)   │   │  price_at_record│       │
//! │  └─────────────────┘   │  price, stock   │   └────────┬────────┘       │
//! │                        └─────────────────┘            │                 │
//! │                                              ┌────────▼────────┐       │
//! │  ┌─────────────────┐   ┌─────────────────┐   │  Transaction    │       │
//! │  │ PaymentMethod   │   │TransactionStatus│   │  ─────────────  │       │
//! │  │  CASH           │   │  PENDING ──┬──► │   │  total_amount   │       │
//! │  │  CARD           │   │  PAID      │    │   │  status         │       │
//! │  │  QRIS           │   │  CANCELLED◄┘    │   │  sync_status    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All wire types serialize with camelCase keys to match the web client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::{
    validate_category_name, validate_image_url, validate_price, validate_product_name,
    validate_sku, validate_stock, ValidationResult,
};

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer pays.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    /// Physical cash, settled at the till.
    Cash,
    /// Card payment through the gateway.
    Card,
    /// QRIS payment through the gateway.
    Qris,
}

impl PaymentMethod {
    /// Status a freshly created transaction starts in.
    ///
    /// Cash is settled on the spot; every other method waits for the
    /// gateway's notification.
    pub const fn initial_status(self) -> TransactionStatus {
        match self {
            PaymentMethod::Cash => TransactionStatus::Paid,
            PaymentMethod::Card | PaymentMethod::Qris => TransactionStatus::Pending,
        }
    }

    /// Whether a payment session must be opened with the gateway.
    #[inline]
    pub const fn requires_gateway(self) -> bool {
        !matches!(self, PaymentMethod::Cash)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Qris => "QRIS",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// Payment state of a transaction.
///
/// ## State Machine
/// ```text
///            ┌──────────► PAID (terminal)
///  PENDING ──┤
///            └──────────► CANCELLED (terminal)
///
///  CASH checkouts are born PAID.
/// ```
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Paid,
    Cancelled,
}

impl TransactionStatus {
    /// Returns true once no further status change is accepted.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, TransactionStatus::Paid | TransactionStatus::Cancelled)
    }

    /// Whether a verified gateway callback may move `self` to `next`.
    ///
    /// Only PENDING transactions change, and only to PAID or CANCELLED.
    /// PENDING → PENDING is allowed but changes nothing.
    pub const fn can_transition_to(self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Pending)
                | (TransactionStatus::Pending, TransactionStatus::Paid)
                | (TransactionStatus::Pending, TransactionStatus::Cancelled)
        )
    }

    /// Checked transition, for callers that want the reason on refusal.
    pub fn transition_to(self, next: TransactionStatus) -> CoreResult<TransactionStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidStatusTransition { from: self, to: next })
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Paid => "PAID",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Pending
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sync Status
// =============================================================================

/// How a transaction reached the server.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncStatus {
    /// Checked out directly against the server.
    Online,
    /// Recorded offline and replayed through `/sync`.
    Synced,
}

/// Outcome recorded in the sync audit log.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncLogStatus {
    Success,
    Failed,
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Category listing row with the number of products filed under it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCount {
    pub id: String,
    pub name: String,
    pub product_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for `POST /categories`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
}

impl NewCategory {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_category_name(&self.name)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    pub name: String,

    /// Current unit price.
    pub price: Money,

    /// Units on hand. Never negative.
    pub stock: i64,

    pub category_id: Option<String>,

    /// Image URL shown on the checkout grid.
    pub image: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks whether `quantity` units can be taken from stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

/// Product with its category, as returned by the catalog endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
}

/// Input for `POST /products`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewProduct {
    /// Runs every field rule, stopping at the first failure.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_sku(&self.sku)?;
        validate_product_name(&self.name)?;
        validate_price(self.price)?;
        validate_stock(self.stock)?;
        if let Some(image) = &self.image {
            validate_image_url(image)?;
        }
        Ok(())
    }
}

/// Input for `PATCH /products/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl ProductUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(sku) = &self.sku {
            validate_sku(sku)?;
        }
        if let Some(name) = &self.name {
            validate_product_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        if let Some(image) = &self.image {
            validate_image_url(image)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.sku.is_none()
            && self.name.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.category_id.is_none()
            && self.image.is_none()
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A recorded sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Server UUID, or the client's offline id for synced transactions.
    pub id: String,
    /// Σ quantity × price_at_record over the items.
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub sync_status: SyncStatus,
    pub cashier_id: String,
    /// Gateway-side transaction reference, set by the payment callback.
    pub midtrans_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A line of a transaction, with the price frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub price_at_record: Money,
}

impl TransactionItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price_at_record.multiply_quantity(self.quantity)
    }
}

/// Transaction together with its items, returned by checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransactionWithItems {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

/// Item row in the history view, with the product it refers to.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItemDetail {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: i64,
    pub price_at_record: Money,
}

/// Entry of `GET /transactions`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHistory {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub items: Vec<TransactionItemDetail>,
}

// =============================================================================
// Sync Log
// =============================================================================

/// Audit trail entry written by the server for each sync batch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SyncLog {
    pub id: String,
    pub status: SyncLogStatus,
    pub details: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
