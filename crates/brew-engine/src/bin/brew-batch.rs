//! # Batch Intake
//!
//! Reads a JSON array of orders and runs it through the batch processor.
//!
//! ## Usage
//! ```bash
//! # Against the configured store (brew.toml / BREW_* variables)
//! cargo run -p brew-engine --bin brew-batch -- orders.json
//!
//! # Throwaway run on the memory backend with a menu and pantry loaded first
//! BREW_STORAGE_BACKEND=memory \
//!     cargo run -p brew-engine --bin brew-batch -- --fixtures shop.json orders.json
//! ```
//!
//! Prints the batch result as pretty JSON on stdout. Exits non-zero if the
//! batch was aborted.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Deserialize;
use tracing::error;

use brew_core::{InventoryItem, MenuItem, OrderDraft};
use brew_engine::{init_tracing, Engine, EngineConfig};

/// Menu and pantry to register before the batch runs.
#[derive(Debug, Default, Deserialize)]
struct Fixtures {
    #[serde(default)]
    menu: Vec<MenuItem>,
    #[serde(default)]
    inventory: Vec<Ingredient>,
}

#[derive(Debug, Deserialize)]
struct Ingredient {
    ingredient_id: String,
    name: String,
    quantity: i64,
    unit: String,
}

struct Args {
    config: Option<PathBuf>,
    fixtures: Option<PathBuf>,
    orders: PathBuf,
}

fn print_help() {
    println!("Brew Batch Intake");
    println!();
    println!("Usage: brew-batch [OPTIONS] <ORDERS.json>");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>     Config file (default: platform config dir brew.toml)");
    println!("  -f, --fixtures <PATH>   JSON with \"menu\" and \"inventory\" arrays to load first");
    println!("  -h, --help              Show this help message");
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();

    let mut config = None;
    let mut fixtures = None;
    let mut orders = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--fixtures" | "-f" => {
                if i + 1 < args.len() {
                    fixtures = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => return None,
            other => orders = Some(PathBuf::from(other)),
        }
        i += 1;
    }

    Some(Args {
        config,
        fixtures,
        orders: orders?,
    })
}

async fn load_fixtures(engine: &Engine, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let fixtures: Fixtures = serde_json::from_str(&std::fs::read_to_string(path)?)?;

    for ingredient in fixtures.inventory {
        let item = InventoryItem::new(
            ingredient.ingredient_id,
            ingredient.name,
            ingredient.quantity,
            ingredient.unit,
        );
        engine.ledger.register(&item).await?;
    }
    for item in &fixtures.menu {
        engine.catalog.add(item).await?;
    }
    Ok(())
}

async fn run(args: Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = EngineConfig::load(args.config)?;
    let engine = Engine::open(&config).await?;

    if let Some(path) = &args.fixtures {
        load_fixtures(&engine, path).await?;
    }

    let drafts: Vec<OrderDraft> = serde_json::from_str(&std::fs::read_to_string(&args.orders)?)?;

    match engine.batch.process_batch(drafts).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "Batch failed");
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let Some(args) = parse_args() else {
        print_help();
        return ExitCode::SUCCESS;
    };

    init_tracing();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("brew-batch: {}", e);
            ExitCode::FAILURE
        }
    }
}
