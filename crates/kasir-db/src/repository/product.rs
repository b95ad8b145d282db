//! # Product Repository
//!
//! Catalog CRUD and search.
//!
//! ## Key Operations
//! - List / search with the owning category joined in
//! - Partial updates (`PATCH`) through COALESCE
//! - Stock is NOT written here outside of create/update; checkout
//!   decrements it inside [`TransactionRepository`](super::transaction::TransactionRepository)
//!
//! ```text
//! products p ──LEFT JOIN── categories c ON c.id = p.category_id
//!      │
//!      ▼
//! ProductRow (flat) ──► ProductDetail { product, category: Option<Category> }
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kasir_core::{Category, Money, NewProduct, Product, ProductDetail, ProductUpdate};

const DETAIL_SELECT: &str = r#"
    SELECT
        p.id, p.sku, p.name, p.price, p.stock, p.category_id, p.image,
        p.created_at, p.updated_at,
        c.name       AS category_name,
        c.created_at AS category_created_at,
        c.updated_at AS category_updated_at
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

const PRODUCT_COLUMNS: &str =
    "id, sku, name, price, stock, category_id, image, created_at, updated_at";

/// Flat row of the product/category join.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    sku: String,
    name: String,
    price: Money,
    stock: i64,
    category_id: Option<String>,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_name: Option<String>,
    category_created_at: Option<DateTime<Utc>>,
    category_updated_at: Option<DateTime<Utc>>,
}

impl From<ProductRow> for ProductDetail {
    fn from(row: ProductRow) -> Self {
        let category = match (
            row.category_id.clone(),
            row.category_name,
            row.category_created_at,
            row.category_updated_at,
        ) {
            (Some(id), Some(name), Some(created_at), Some(updated_at)) => Some(Category {
                id,
                name,
                created_at,
                updated_at,
            }),
            _ => None,
        };

        ProductDetail {
            product: Product {
                id: row.id,
                sku: row.sku,
                name: row.name,
                price: row.price,
                stock: row.stock,
                category_id: row.category_id,
                image: row.image,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            category,
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let hits = repo.search("nasi").await?;
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// All products ordered by name, each with its category.
    pub async fn list(&self) -> DbResult<Vec<ProductDetail>> {
        let sql = format!("{DETAIL_SELECT} ORDER BY p.name ASC");
        let rows: Vec<ProductRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        debug!(count = rows.len(), "Listed products");
        Ok(rows.into_iter().map(ProductDetail::from).collect())
    }

    /// Case-insensitive substring match on name or SKU.
    ///
    /// `%` and `_` in the query are matched literally.
    pub async fn search(&self, query: &str) -> DbResult<Vec<ProductDetail>> {
        debug!(query = %query, "Searching products");

        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let sql = format!(
            r#"{DETAIL_SELECT}
            WHERE LOWER(p.name) LIKE ?1 ESCAPE '\'
               OR LOWER(p.sku) LIKE ?1 ESCAPE '\'
            ORDER BY p.name ASC"#
        );

        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Search returned products");
        Ok(rows.into_iter().map(ProductDetail::from).collect())
    }

    /// Gets a product with its category.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ProductDetail>> {
        let sql = format!("{DETAIL_SELECT} WHERE p.id = ?1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ProductDetail::from))
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");
        let product: Option<Product> = sqlx::query_as(&sql)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// - `UniqueViolation { field: "sku" }` when the SKU is taken
    /// - `ForeignKeyViolation` when `category_id` does not exist
    pub async fn insert(&self, input: &NewProduct) -> DbResult<Product> {
        debug!(sku = %input.sku, "Inserting product");

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: input.sku.trim().to_string(),
            name: input.name.trim().to_string(),
            price: input.price,
            stock: input.stock,
            category_id: input.category_id.clone().filter(|id| !id.is_empty()),
            image: input.image.clone().filter(|url| !url.is_empty()),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, price, stock, category_id, image, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.category_id)
        .bind(&product.image)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| explain_write_error(e.into(), &product.sku, product.category_id.as_deref()))?;

        Ok(product)
    }

    /// Applies a partial update. Absent fields keep their value; an empty
    /// string clears `image` or `category_id`.
    pub async fn update(&self, id: &str, changes: &ProductUpdate) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku         = COALESCE(?2, sku),
                name        = COALESCE(?3, name),
                price       = COALESCE(?4, price),
                stock       = COALESCE(?5, stock),
                category_id = CASE WHEN ?6 IS NULL THEN category_id ELSE NULLIF(?6, '') END,
                image       = CASE WHEN ?7 IS NULL THEN image ELSE NULLIF(?7, '') END,
                updated_at  = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(changes.sku.as_deref().map(str::trim))
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.price)
        .bind(changes.stock)
        .bind(&changes.category_id)
        .bind(&changes.image)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            explain_write_error(
                e.into(),
                changes.sku.as_deref().unwrap_or_default(),
                changes.category_id.as_deref(),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product: Product = sqlx::query_as(&sql).bind(id).fetch_one(&self.pool).await?;
        Ok(product)
    }

    /// Deletes a product that no transaction refers to.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => DbError::ForeignKeyViolation {
                    message: format!("Product {id} is referenced by recorded transactions"),
                },
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts total products (for diagnostics and the seeder).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Rewrites constraint errors into messages naming the offending value.
fn explain_write_error(err: DbError, sku: &str, category_id: Option<&str>) -> DbError {
    match err {
        DbError::UniqueViolation { field, .. } if field == "products.sku" => {
            DbError::duplicate("sku", sku)
        }
        DbError::ForeignKeyViolation { .. } => DbError::ForeignKeyViolation {
            message: format!(
                "Category {} does not exist",
                category_id.unwrap_or("unknown")
            ),
        },
        other => other,
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{new_product, seeded_db};

    #[tokio::test]
    async fn test_list_orders_by_name_with_category() {
        let (db, fixture) = seeded_db().await;

        let products = db.products().list().await.unwrap();
        let names: Vec<_> = products.iter().map(|p| p.product.name.as_str()).collect();
        assert_eq!(names, vec!["Es Teh Manis", "Kopi Hitam Toraja", "Nasi Goreng Spesial"]);

        let nasi = products.iter().find(|p| p.product.id == fixture.nasi).unwrap();
        assert_eq!(nasi.category.as_ref().unwrap().name, "Food");
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_on_name_and_sku() {
        let (db, _) = seeded_db().await;
        let repo = db.products();

        assert_eq!(repo.search("NASI").await.unwrap().len(), 1);
        assert_eq!(repo.search("drink-").await.unwrap().len(), 2);
        assert!(repo.search("100%").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_sku() {
        let (db, _) = seeded_db().await;

        let err = db
            .products()
            .insert(&new_product("FOOD-001", "Another", 1_000, 1, None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, ref value } if field == "sku" && value == "FOOD-001"));
    }

    #[tokio::test]
    async fn test_insert_rejects_unknown_category() {
        let (db, _) = seeded_db().await;

        let err = db
            .products()
            .insert(&new_product("FOOD-099", "Ghost", 1_000, 1, Some("missing")))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let (db, fixture) = seeded_db().await;
        let repo = db.products();

        let updated = repo
            .update(
                &fixture.nasi,
                &ProductUpdate {
                    stock: Some(7),
                    image: Some(String::new()),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.stock, 7);
        assert_eq!(updated.name, "Nasi Goreng Spesial");
        assert_eq!(updated.price, Money::from_rupiah(25_000));
        assert!(updated.image.is_none());

        let err = repo
            .update("missing", &ProductUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let (db, fixture) = seeded_db().await;
        let repo = db.products();

        repo.delete(&fixture.kopi).await.unwrap();
        assert!(repo.get_by_id(&fixture.kopi).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&fixture.kopi).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_get_by_sku() {
        let (db, fixture) = seeded_db().await;

        let product = db.products().get_by_sku("DRINK-001").await.unwrap().unwrap();
        assert_eq!(product.id, fixture.teh);
        assert!(db.products().get_by_sku("NOPE").await.unwrap().is_none());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
