//! # Repository Module
//!
//! Database repository implementations for Kasir POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  state.db.transactions().checkout(cashier, &request)           │
//! │       ▼                                                                 │
//! │  TransactionRepository                                                 │
//! │  ├── checkout(&self, cashier_id, request)                              │
//! │  ├── apply_synced(&self, cashier_id, transaction)                      │
//! │  ├── history(&self, cashier_id)                                        │
//! │  └── update_status(&self, id, status, gateway_ref)                     │
//! │       │                                                                 │
//! │       │  SQL inside one unit of work                                   │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD and search
//! - [`CategoryRepository`](category::CategoryRepository) - Categories with product counts
//! - [`TransactionRepository`](transaction::TransactionRepository) - Checkout, sync apply, history
//! - [`SyncLogRepository`](sync_log::SyncLogRepository) - Append-only sync audit
//! - [`ReportRepository`](report::ReportRepository) - Sales aggregates

pub mod category;
pub mod product;
pub mod report;
pub mod sync_log;
pub mod transaction;

#[cfg(test)]
pub(crate) mod test_support {
    use kasir_core::{Money, NewCategory, NewProduct};

    use crate::pool::{Database, DbConfig};

    /// IDs of the rows created by [`seeded_db`].
    pub struct Fixture {
        pub food: String,
        pub drink: String,
        pub nasi: String,
        pub teh: String,
        pub kopi: String,
    }

    pub fn new_product(
        sku: &str,
        name: &str,
        price: i64,
        stock: i64,
        category: Option<&str>,
    ) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: name.to_string(),
            price: Money::from_rupiah(price),
            stock,
            category_id: category.map(str::to_string),
            image: None,
        }
    }

    /// Fresh in-memory database with two categories and three products.
    ///
    /// | SKU       | Name                | Price  | Stock |
    /// |-----------|---------------------|--------|-------|
    /// | FOOD-001  | Nasi Goreng Spesial | 25.000 | 5     |
    /// | DRINK-001 | Es Teh Manis        | 5.000  | 100   |
    /// | DRINK-003 | Kopi Hitam Toraja   | 10.000 | 1     |
    pub async fn seeded_db() -> (Database, Fixture) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let food = db
            .categories()
            .insert(&NewCategory {
                name: "Food".to_string(),
            })
            .await
            .unwrap()
            .id;
        let drink = db
            .categories()
            .insert(&NewCategory {
                name: "Drink".to_string(),
            })
            .await
            .unwrap()
            .id;

        let products = db.products();
        let nasi = products
            .insert(&new_product("FOOD-001", "Nasi Goreng Spesial", 25_000, 5, Some(&food)))
            .await
            .unwrap()
            .id;
        let teh = products
            .insert(&new_product("DRINK-001", "Es Teh Manis", 5_000, 100, Some(&drink)))
            .await
            .unwrap()
            .id;
        let kopi = products
            .insert(&new_product("DRINK-003", "Kopi Hitam Toraja", 10_000, 1, Some(&drink)))
            .await
            .unwrap()
            .id;

        (
            db,
            Fixture {
                food,
                drink,
                nasi,
                teh,
                kopi,
            },
        )
    }
}
