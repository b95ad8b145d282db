//! # Category Repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kasir_core::{Category, CategoryWithCount, NewCategory};

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Categories ordered by name with the number of products in each.
    pub async fn list_with_counts(&self) -> DbResult<Vec<CategoryWithCount>> {
        let categories: Vec<CategoryWithCount> = sqlx::query_as(
            r#"
            SELECT
                c.id, c.name, c.created_at, c.updated_at,
                COUNT(p.id) AS product_count
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Category>> {
        let category: Option<Category> = sqlx::query_as(
            "SELECT id, name, created_at, updated_at FROM categories WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Creates a category. Names are unique.
    pub async fn insert(&self, input: &NewCategory) -> DbResult<Category> {
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        debug!(name = %category.name, "Inserting category");

        sqlx::query(
            "INSERT INTO categories (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("name", category.name.clone()),
            other => other,
        })?;

        Ok(category)
    }
}
