//! # Validation Module
//!
//! Field rules applied before any mutation touches the database.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: JSON extraction (axum)                                       │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── Unknown payment method, non-integer quantity                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Lengths, positivity, URL format, non-empty carts                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (sku, category name, transaction id)                       │
//! │  ├── CHECK (stock >= 0)                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error carries the field name it applies to, so the API can report
//! `{"sku": ["sku must be at least 3 characters"]}`.

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const SKU_MIN_LEN: usize = 3;
pub const SKU_MAX_LEN: usize = 50;
pub const NAME_MAX_LEN: usize = 200;
pub const SEARCH_MAX_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - At least 3 characters after trimming
/// - At most 50 characters
///
/// ## Example
/// ```rust
/// use kasir_core::validation::validate_sku;
///
/// assert!(validate_sku("FOOD-001").is_ok());
/// assert!(validate_sku("AB").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.chars().count() < SKU_MIN_LEN {
        return Err(ValidationError::TooShort {
            field: "sku".to_string(),
            min: SKU_MIN_LEN,
        });
    }

    if sku.chars().count() > SKU_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: SKU_MAX_LEN,
        });
    }

    Ok(())
}

/// Validates a product name: required, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name)
}

/// Validates a category name: required, at most 200 characters.
pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name)
}

fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > NAME_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: NAME_MAX_LEN,
        });
    }

    Ok(())
}

/// Validates a product image reference.
///
/// An empty string clears the image; anything else must parse as an
/// absolute URL.
pub fn validate_image_url(image: &str) -> ValidationResult<()> {
    if image.is_empty() {
        return Ok(());
    }

    url::Url::parse(image).map_err(|e| ValidationError::InvalidFormat {
        field: "image".to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > SEARCH_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: "q".to_string(),
            max: SEARCH_MAX_LEN,
        });
    }

    Ok(query.to_string())
}

/// Validates an identifier supplied by a client (product or offline id).
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a product price: strictly positive.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a stock level: zero or more.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

/// Validates a checkout line quantity: strictly positive.
///
/// `field` is the path reported back, e.g. `items[2].quantity`.
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates the price captured on a checkout line: strictly positive.
pub fn validate_price_at_record(field: &str, price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
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

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("FOOD-001").is_ok());
        assert!(validate_sku("ABC").is_ok());

        assert!(matches!(
            validate_sku("AB"),
            Err(ValidationError::TooShort { min: 3, .. })
        ));
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_names() {
        assert!(validate_product_name("Es Teh Manis").is_ok());
        assert!(matches!(
            validate_product_name(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_product_name(&"A".repeat(201)).is_err());
        assert!(validate_category_name("Food").is_ok());
        assert!(validate_category_name("  ").is_err());
    }

    #[test]
    fn test_validate_image_url() {
        assert!(validate_image_url("").is_ok());
        assert!(validate_image_url("https://images.unsplash.com/photo-1").is_ok());
        assert!(validate_image_url("nasi-goreng.png").is_err());
    }

    #[test]
    fn test_validate_numbers() {
        assert!(validate_price(Money::from_rupiah(1)).is_ok());
        assert!(validate_price(Money::zero()).is_err());
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());

        assert!(validate_quantity("items[0].quantity", 1).is_ok());
        let err = validate_quantity("items[0].quantity", 0).unwrap_err();
        assert_eq!(err.field(), "items[0].quantity");

        assert!(validate_price_at_record("items[1].priceAtRecord", Money::from_rupiah(-1)).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  nasi ").unwrap(), "nasi");
        assert_eq!(validate_search_query("").unwrap(), "");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("productId", "p1").is_ok());
        assert_eq!(validate_id("id", " ").unwrap_err().field(), "id");
    }
}
