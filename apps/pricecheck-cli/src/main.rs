//! # Pricecheck CLI
//!
//! Runs one lookup, search, schema or health command against a deployment
//! and prints the result as JSON on stdout. Logs go to stderr.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Parse arguments                                                     │
//! │  2. Initialize tracing (RUST_LOG, default "info")                      │
//! │  3. Load config: --config path, else the platform config dir           │
//! │     (pricecheck/config.toml), else defaults                            │
//! │  4. Apply PRICECHECK_* environment overrides, validate                 │
//! │  5. Connect (read-only pool), build SchemaCache + service              │
//! │  6. Run the command; Ctrl-C cancels it                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pricecheck_db::{Database, DbConfig, SchemaCache};
use pricecheck_lookup::ProductResolutionService;

use crate::config::{load_config, CliError};

#[derive(Parser)]
#[command(name = "pricecheck")]
#[command(about = "Resolve scanned barcodes to products and prices")]
#[command(version)]
struct Cli {
    /// Deployment configuration file (TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one barcode to a product
    Lookup {
        /// Scanned or typed barcode, GS1 payloads included
        barcode: String,
    },

    /// Fragment search over barcodes, codes and names
    Search {
        keyword: String,

        /// Maximum results (non-positive means the default, capped at 50)
        #[arg(default_value_t = 20, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Show the introspected product table schema
    Schema,

    /// Check that the store answers
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let config = load_config(cli.config.as_deref())?;

    let db = Database::connect(DbConfig::from_deployment(&config)).await?;
    info!("Connected to store");

    if let Command::Health = cli.command {
        let healthy = db.health_check().await;
        print_json(&json!({ "healthy": healthy }))?;
        db.close().await;
        return Ok(if healthy { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let cache = SchemaCache::from_config(db.introspector(), &config)?;
    let service = ProductResolutionService::new(config, cache, db.products());
    let cancel = cancel_on_ctrl_c();

    let outcome = match cli.command {
        Command::Lookup { barcode } => {
            let result = service.lookup(&barcode, &cancel).await?;
            let found = result.is_some();
            print_json(&result)?;
            if found {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Command::Search { keyword, limit } => {
            let items = service.search(&keyword, limit, &cancel).await?;
            print_json(&items)?;
            ExitCode::SUCCESS
        }
        Command::Schema => {
            let snapshot = service.schema_snapshot(&cancel).await?;
            print_json(&json!({
                "columns": snapshot.column_names(),
                "hasBarcodeFunction": snapshot.has_barcode_function(),
                "expiresAt": snapshot.expires_at().to_rfc3339(),
            }))?;
            ExitCode::SUCCESS
        }
        Command::Health => ExitCode::SUCCESS,
    };

    db.close().await;
    Ok(outcome)
}

/// Initializes the tracing subscriber on stderr.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show every store call and strategy hit
/// - `RUST_LOG=pricecheck_lookup=debug` - Engine only
/// - Default: INFO, sqlx at WARN
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// A token cancelled by the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            trigger.cancel();
        }
    });

    cancel
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)?;
    println!("{}", text);
    Ok(())
}
