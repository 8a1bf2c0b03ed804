//! # Seed Data Generator
//!
//! Populates a database with a small coffee shop menu and pantry for
//! development.
//!
//! ## Usage
//! ```bash
//! cargo run -p brew-db --bin seed
//!
//! # Specify database path
//! cargo run -p brew-db --bin seed -- --db ./data/brew.db
//! ```
//!
//! Stock levels are sized so a few dozen drinks can be ordered before the
//! first ingredient runs dry.

use std::env;

use brew_core::validation::{validate_inventory_item, validate_menu_item};
use brew_core::{InventoryItem, MenuItem, RecipeLine};
use brew_db::{Database, DbConfig, InventoryStore, MenuStore};

/// (id, name, quantity, unit)
const PANTRY: &[(&str, &str, i64, &str)] = &[
    ("espresso", "Espresso shot", 200, "shot"),
    ("milk", "Whole milk", 20_000, "ml"),
    ("oat_milk", "Oat milk", 5_000, "ml"),
    ("chocolate", "Chocolate sauce", 2_000, "g"),
    ("vanilla", "Vanilla syrup", 1_000, "ml"),
    ("caramel", "Caramel syrup", 1_000, "ml"),
    ("water", "Filtered water", 50_000, "ml"),
    ("tea", "Black tea bag", 100, "bag"),
    ("croissant", "Butter croissant", 24, "piece"),
];

/// (id, name, description, price_cents, recipe)
const MENU: &[(&str, &str, &str, i64, &[(&str, i64)])] = &[
    (
        "espresso",
        "Espresso",
        "A single shot",
        250,
        &[("espresso", 1)],
    ),
    (
        "americano",
        "Americano",
        "Espresso topped with hot water",
        300,
        &[("espresso", 1), ("water", 200)],
    ),
    (
        "latte",
        "Latte",
        "Espresso and steamed milk",
        450,
        &[("espresso", 1), ("milk", 200)],
    ),
    (
        "cappuccino",
        "Cappuccino",
        "Espresso, steamed milk and foam",
        420,
        &[("espresso", 1), ("milk", 150)],
    ),
    (
        "mocha",
        "Mocha",
        "Espresso, chocolate and steamed milk",
        500,
        &[("espresso", 1), ("milk", 150), ("chocolate", 30)],
    ),
    (
        "vanilla_latte",
        "Vanilla Latte",
        "Latte with vanilla syrup",
        520,
        &[("espresso", 1), ("milk", 200), ("vanilla", 20)],
    ),
    (
        "caramel_macchiato",
        "Caramel Macchiato",
        "Vanilla milk marked with espresso and caramel",
        550,
        &[("espresso", 2), ("milk", 200), ("vanilla", 10), ("caramel", 15)],
    ),
    (
        "oat_latte",
        "Oat Latte",
        "Espresso and steamed oat milk",
        500,
        &[("espresso", 1), ("oat_milk", 200)],
    ),
    (
        "black_tea",
        "Black Tea",
        "Brewed to order",
        280,
        &[("tea", 1), ("water", 250)],
    ),
    (
        "croissant",
        "Croissant",
        "Baked this morning",
        350,
        &[("croissant", 1)],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./brew_dev.db");

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
                println!("Brew Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./brew_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Brew Seed Data Generator");
    println!("========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.menu().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} menu items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Stocking pantry...");
    let inventory = db.inventory();
    for (id, name, quantity, unit) in PANTRY {
        let item = InventoryItem::new(*id, *name, *quantity, *unit);
        validate_inventory_item(&item)?;
        inventory.insert(&item).await?;
        println!("  {:<12} {:>6} {}", id, quantity, unit);
    }

    println!();
    println!("Writing menu...");
    let menu = db.menu();
    for (id, name, description, price_cents, recipe) in MENU {
        let item = MenuItem {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            price_cents: *price_cents,
            ingredients: recipe
                .iter()
                .map(|(ingredient, qty)| RecipeLine::new(*ingredient, *qty))
                .collect(),
        };
        validate_menu_item(&item)?;
        menu.insert(&item).await?;
        println!("  {:<18} {}", id, item.price());
    }

    println!();
    println!(
        "✓ Seeded {} ingredients and {} menu items",
        inventory.count().await?,
        menu.count().await?
    );

    Ok(())
}
