//! # Checkout
//!
//! The cart submitted by a cashier and the arithmetic around it.
//!
//! ## Checkout Flow
//! ```text
//! CheckoutRequest ──► validate() ──► (db) per line: conditional stock decrement
//!                                          │
//!                                          ├── product missing → ProductNotFound
//!                                          ├── stock < qty     → InsufficientStock
//!                                          │
//!                                          ▼
//!                          total_amount() = Σ quantity × price_at_record
//!                                          │
//!                                          ▼
//!                 status = payment_method.initial_status()
//! ```
//!
//! The client's `priceAtRecord` is authoritative for the line price; the
//! client's idea of the total is never accepted.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, Product};
use crate::validation::{validate_id, validate_price_at_record, validate_quantity, ValidationResult};

/// One cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: i64,
    pub price_at_record: Money,
}

impl CheckoutItem {
    /// `None` on overflow.
    #[inline]
    pub fn line_total(&self) -> Option<Money> {
        self.price_at_record.checked_multiply_quantity(self.quantity)
    }
}

/// Body of `POST /checkout`, also the `data` of each offline transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    pub items: Vec<CheckoutItem>,
}

impl CheckoutRequest {
    /// Rejects an empty cart, any line with a blank product id or a
    /// non-positive quantity or price, and carts whose total or unit count
    /// does not fit in an `i64`.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            });
        }

        for (i, item) in self.items.iter().enumerate() {
            validate_id(&format!("items[{i}].productId"), &item.product_id)?;
            validate_quantity(&format!("items[{i}].quantity"), item.quantity)?;
            validate_price_at_record(&format!("items[{i}].priceAtRecord"), item.price_at_record)?;
        }

        self.total_amount()?;
        self.items
            .iter()
            .try_fold(0i64, |count, item| count.checked_add(item.quantity))
            .ok_or_else(|| ValidationError::TooLarge {
                field: "items".to_string(),
            })?;

        Ok(())
    }

    /// Σ quantity × price_at_record, or `TooLarge` on overflow.
    pub fn total_amount(&self) -> ValidationResult<Money> {
        self.items
            .iter()
            .try_fold(Money::zero(), |total, item| {
                item.line_total().and_then(|line| total.checked_add(line))
            })
            .ok_or_else(|| ValidationError::TooLarge {
                field: "items".to_string(),
            })
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> i64 {
        self.items
            .iter()
            .fold(0, |count: i64, item| count.saturating_add(item.quantity))
    }
}

/// Checks that `product` can cover `quantity` units.
///
/// ## Example
/// ```rust,ignore
/// ensure_stock(&product, 2)?; // InsufficientStock if product.stock < 2
/// ```
pub fn ensure_stock(product: &Product, quantity: i64) -> CoreResult<()> {
    if !product.can_sell(quantity) {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock,
            requested: quantity,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(product_id: &str, quantity: i64, price: i64) -> CheckoutItem {
        CheckoutItem {
            product_id: product_id.to_string(),
            quantity,
            price_at_record: Money::from_rupiah(price),
        }
    }

    fn product(stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            sku: "FOOD-001".to_string(),
            name: "Nasi Goreng Spesial".to_string(),
            price: Money::from_rupiah(25_000),
            stock,
            category_id: None,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_total_is_sum_of_lines() {
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![item("p1", 2, 24_000), item("p2", 3, 5_000), item("p3", 1, 4_000)],
        };
        assert_eq!(
            request.total_amount(),
            Ok(Money::from_rupiah(48_000 + 15_000 + 4_000))
        );
        assert_eq!(request.item_count(), 6);
    }

    #[test]
    fn test_validate_rejects_empty_cart() {
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Qris,
            items: vec![],
        };
        assert_eq!(request.validate().unwrap_err().field(), "items");
    }

    #[test]
    fn test_validate_reports_line_path() {
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![item("p1", 1, 1_000), item("p2", 0, 1_000)],
        };
        assert_eq!(request.validate().unwrap_err().field(), "items[1].quantity");

        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![item("p1", 1, 0)],
        };
        assert_eq!(
            request.validate().unwrap_err().field(),
            "items[0].priceAtRecord"
        );

        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![item("", 1, 1_000)],
        };
        assert_eq!(request.validate().unwrap_err().field(), "items[0].productId");
    }

    #[test]
    fn test_validate_rejects_overflowing_total() {
        let half = i64::MAX / 2 + 1;
        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![item("p1", 1, half), item("p1", 1, half)],
        };
        assert_eq!(
            request.validate(),
            Err(ValidationError::TooLarge {
                field: "items".to_string()
            })
        );
        assert!(request.total_amount().is_err());

        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![item("p1", i64::MAX, 2)],
        };
        assert_eq!(request.validate().unwrap_err().field(), "items");

        let request = CheckoutRequest {
            payment_method: PaymentMethod::Cash,
            items: vec![item("p1", i64::MAX, 1), item("p2", 1, 1)],
        };
        assert_eq!(request.validate().unwrap_err().field(), "items");
    }

    #[test]
    fn test_wire_format() {
        let request: CheckoutRequest = serde_json::from_str(
            r#"{"paymentMethod":"CASH","items":[{"productId":"p1","quantity":2,"priceAtRecord":24000}]}"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.total_amount().unwrap().rupiah(), 48_000);

        let fractional = serde_json::from_str::<CheckoutRequest>(
            r#"{"paymentMethod":"CASH","items":[{"productId":"p1","quantity":1.5,"priceAtRecord":24000}]}"#,
        );
        assert!(fractional.is_err());
    }

    #[test]
    fn test_ensure_stock() {
        assert!(ensure_stock(&product(5), 2).is_ok());
        assert!(ensure_stock(&product(2), 2).is_ok());

        let err = ensure_stock(&product(1), 2).unwrap_err();
        assert_eq!(err.to_string(), "Insufficient stock for product: Nasi Goreng Spesial");
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 1, requested: 2, .. }
        ));
    }
}
