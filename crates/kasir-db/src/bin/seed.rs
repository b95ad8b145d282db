//! # Seed Data
//!
//! Populates the server database with the demo catalog.
//!
//! ## Usage
//! ```bash
//! # Seed ./kasir.db
//! cargo run -p kasir-db --bin seed
//!
//! # Specify database path
//! cargo run -p kasir-db --bin seed -- --db ./data/kasir.db
//! ```
//!
//! ## Catalog
//! Two categories (Food, Drink) with 15 products each. SKUs follow
//! `{CATEGORY}-{NNN}`, prices are whole rupiah.

use std::env;

use kasir_core::{Money, NewCategory, NewProduct};
use kasir_db::{Database, DbConfig};

/// (sku, name, price, stock, unsplash photo id)
type SeedProduct = (&'static str, &'static str, i64, i64, &'static str);

const FOOD: &[SeedProduct] = &[
    ("FOOD-001", "Nasi Goreng Spesial", 25_000, 50, "1546069901-ba9599a7e63c"),
    ("FOOD-002", "Mie Ayam Pangsit", 18_000, 40, "1512621776951-a57141f2eefd"),
    ("FOOD-003", "Sate Ayam Madura", 22_000, 30, "1565299624946-b28f40a0ae38"),
    ("FOOD-004", "Bakso Sapi Urat", 15_000, 100, "1513104890138-7c749659a591"),
    ("FOOD-005", "Gado-Gado Betawi", 17_000, 25, "1568901346375-23c9450c58cd"),
    ("FOOD-006", "Ayam Goreng Penyet", 20_000, 45, "1551024601-bec78aea704b"),
    ("FOOD-007", "Rendang Sapi", 35_000, 20, "1540420773420-3366772f4999"),
    ("FOOD-008", "Soto Ayam Lamongan", 16_000, 35, "1565958011703-44f9829ba187"),
    ("FOOD-009", "Pempek Kapal Selam", 25_000, 15, "1482049016688-2d3e1b311543"),
    ("FOOD-010", "Martabak Manis Cokelat", 30_000, 12, "1484723091739-30a097e8f929"),
    ("FOOD-011", "Nasi Uduk Komplit", 20_000, 40, "1473093226795-af9932fe5856"),
    ("FOOD-012", "Burger Sapi Keju", 28_000, 20, "1504674900247-0877df9cc836"),
    ("FOOD-013", "Pizza Margherita", 45_000, 10, "1476514525535-07fb3b4ae5f1"),
    ("FOOD-014", "Pasta Carbonara", 32_000, 15, "1467003909585-2f8a72700288"),
    ("FOOD-015", "Kebab Turki", 15_000, 50, "1504754524776-8f4f37790ca0"),
];

const DRINK: &[SeedProduct] = &[
    ("DRINK-001", "Es Teh Manis", 5_000, 200, "1556679343-c7306c1976bc"),
    ("DRINK-002", "Es Jeruk Segar", 7_000, 150, "1613478223719-2ab802602423"),
    ("DRINK-003", "Kopi Hitam Toraja", 10_000, 100, "1509042239860-f550ce710b93"),
    ("DRINK-004", "Cappuccino Hot", 15_000, 80, "1514362545857-3bc16c4c7d1b"),
    ("DRINK-005", "Es Cokelat Premium", 12_000, 60, "1544145945-8c366624d08b"),
    ("DRINK-006", "Jus Alpukat", 12_000, 40, "1551024709-8f23befc6f87"),
    ("DRINK-007", "Thai Tea Ice", 10_000, 90, "1502998070258-dc1338445ac2"),
    ("DRINK-008", "Green Tea Latte", 15_000, 70, "1510812431401-41d2bd2722f3"),
    ("DRINK-009", "Soda Gembira", 10_000, 50, "1470337458703-46ad1756a187"),
    ("DRINK-010", "Mineral Water", 4_000, 300, "1523362622666-18d0fd50055c"),
    ("DRINK-011", "Es Campur", 12_000, 30, "1525385133512-2f3bdd039054"),
    ("DRINK-012", "Boba Milk Tea", 18_000, 40, "1572490122747-3968b75cc699"),
    ("DRINK-013", "Lemonade Ice", 8_000, 100, "1514432324607-a09d9b4aefdd"),
    ("DRINK-014", "Mango Smoothie", 15_000, 50, "1542729779-11d8fe8e25f6"),
    ("DRINK-015", "Hot Chocolate", 12_000, 60, "1538587888044-79f13ddd7e49"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./kasir.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kasir POS Seed Data");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./kasir.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Kasir POS Seed Data");
    println!("======================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut seeded = 0;
    for (category_name, products) in [("Food", FOOD), ("Drink", DRINK)] {
        let category_id = ensure_category(&db, category_name).await?;
        println!("✓ Category {}", category_name);

        for &(sku, name, price, stock, photo) in products {
            let product = NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                price: Money::from_rupiah(price),
                stock,
                category_id: Some(category_id.clone()),
                image: Some(format!(
                    "https://images.unsplash.com/photo-{photo}?auto=format&fit=crop&w=800&q=60"
                )),
            };

            if let Err(e) = db.products().insert(&product).await {
                eprintln!("Failed to insert {}: {}", sku, e);
                continue;
            }
            seeded += 1;
        }
    }

    println!();
    println!("✓ Seeding finished. {} products seeded.", seeded);

    Ok(())
}

async fn ensure_category(db: &Database, name: &str) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(existing) = db.categories().get_by_name(name).await? {
        return Ok(existing.id);
    }

    let created = db
        .categories()
        .insert(&NewCategory {
            name: name.to_string(),
        })
        .await?;
    Ok(created.id)
}
