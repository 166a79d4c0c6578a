//! # Seed Data Generator
//!
//! Populates the database with test products, purchases and sales for
//! development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p stockbook-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p stockbook-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p stockbook-db --bin seed -- --db ./data/stockbook.db
//! ```
//!
//! Every product gets an initial purchase (batch + warehouse stock),
//! some stock is transferred to the shop, and a handful of sales are
//! run through the checkout service, so the seeded database satisfies
//! the ledger-replay invariant out of the box.

use std::env;

use stockbook_core::Location;
use stockbook_db::{
    CheckoutItem, CheckoutRequest, CustomerInfo, Database, DbConfig, PurchaseLineRequest,
    PurchaseRequest,
};
use stockbook_core::PaymentMethod;

const SEED_USER: &str = "seed";

/// Product categories for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "GRO",
        &[
            "Basmati Rice 5kg", "White Flour 10kg", "Sugar 1kg", "Salt 800g", "Cooking Oil 5L",
            "Red Lentils 1kg", "Chickpeas 1kg", "Black Tea 500g", "Green Tea 250g", "Honey 500g",
        ],
    ),
    (
        "BEV",
        &[
            "Cola 1.5L", "Lemon Soda 1.5L", "Orange Juice 1L", "Apple Juice 1L", "Mineral Water 6x1.5L",
            "Energy Drink 250ml", "Iced Tea 500ml", "Mango Shake 300ml", "Milk 1L", "Yogurt Drink 500ml",
        ],
    ),
    (
        "SNK",
        &[
            "Potato Chips 150g", "Nimko Mix 400g", "Salted Peanuts 250g", "Biscuits Family Pack",
            "Chocolate Bar", "Candy Jar", "Crackers 300g", "Popcorn 100g", "Dates 500g", "Cake Rusk",
        ],
    ),
    (
        "HOME",
        &[
            "Dish Soap 750ml", "Laundry Powder 3kg", "Bleach 1L", "Trash Bags 30pc",
            "Paper Towels 4pk", "Toilet Paper 12pk", "Matches 10pk", "Candles 6pc",
            "Light Bulb 12W", "Batteries AA 4pk",
        ],
    ),
];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Ali Raza", "03001234567"),
    ("Sara Khan", "03017654321"),
    ("Bilal Ahmed", "03219876543"),
    ("Walk-in", "03000000000"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./stockbook_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./stockbook_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stockbook Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
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

    println!();
    println!("Generating products...");

    let mut product_ids = Vec::new();
    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (category, names) in CATEGORIES {
        for (index, name) in names.iter().enumerate() {
            for variant in 0..(count / (CATEGORIES.len() * names.len()) + 1) {
                if generated >= count {
                    break 'outer;
                }

                let seed = generated;
                let sku = format!("{}-{:03}-{}", category, index, variant);
                let price_cents = 199 + ((seed * 37) % 2800) as i64;

                let mut product = stockbook_db::repository::product::new_product(
                    sku,
                    format!("{} #{}", name, variant + 1),
                    price_cents,
                );
                product.barcode = Some(format!("590{:010}", seed));
                product.category = Some(category.to_string());
                db.products().insert(&product).await?;

                // Initial purchase: batch + warehouse stock + ledger row
                let quantity = 20 + (seed % 60) as i64;
                let unit_cost_cents = price_cents * (55 + (seed % 25) as i64) / 100;
                db.purchasing()
                    .record_purchase(
                        PurchaseRequest {
                            invoice_number: Some(format!("SEED-{:05}", seed)),
                            lines: vec![PurchaseLineRequest {
                                product_id: product.id.clone(),
                                quantity,
                                unit_cost_cents,
                                supplier: Some("Seed Wholesale".to_string()),
                                batch_number: None,
                                purchase_date: None,
                            }],
                            tax_cents: 0,
                            notes: None,
                        },
                        SEED_USER,
                    )
                    .await?;

                // Move part of the stock onto the shop floor
                let transfer = db
                    .transfers()
                    .create(
                        &product.id,
                        Location::Warehouse,
                        Location::Shop,
                        quantity / 2,
                        SEED_USER,
                    )
                    .await?;
                db.transfers().complete(&transfer.id, SEED_USER).await?;

                product_ids.push(product.id);
                generated += 1;

                if generated % 50 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    // A few sales, including partial payments and credit
    println!();
    println!("Running sample checkouts...");
    let mut sales = 0;
    for (index, product_id) in product_ids.iter().take(24).enumerate() {
        let (name, mobile) = CUSTOMERS[index % CUSTOMERS.len()];
        let product = db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or("seeded product missing")?;
        let quantity = 1 + (index % 3) as i64;
        let total = product.selling_price_cents * quantity;
        // Cycle paid-in-full, partial, unpaid
        let paid = match index % 3 {
            0 => total,
            1 => total / 2,
            _ => 0,
        };

        db.checkout()
            .checkout(
                CheckoutRequest {
                    items: vec![CheckoutItem {
                        product_id: product_id.clone(),
                        quantity,
                        unit_price_cents: None,
                    }],
                    location: Location::Shop,
                    customer: CustomerInfo {
                        name: name.to_string(),
                        mobile: mobile.to_string(),
                    },
                    payment_method: PaymentMethod::Cash,
                    amount_paid_cents: paid,
                    discount_cents: 0,
                    tax_rate_bps: 0,
                    notes: None,
                },
                SEED_USER,
            )
            .await?;
        sales += 1;
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products, {} sales in {:?}", generated, sales, elapsed);

    // Every seeded product must satisfy the replay invariant
    println!();
    println!("Verifying ledger consistency...");
    let drifted = db.reconciliation().audit().await?;
    if drifted.is_empty() {
        println!("  All counters reconcile with the ledger");
    } else {
        for report in &drifted {
            eprintln!(
                "  DRIFT {}: stored {:?} vs replayed {:?}",
                report.sku, report.stored, report.replayed
            );
        }
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
