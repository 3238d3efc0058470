//! Shopfloor CLI - Database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! shopfloor migrate
//!
//! # Load categories and products from a YAML file
//! shopfloor seed catalog --file catalog.yaml
//! ```
//!
//! Both commands read `SHOPFLOOR_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shopfloor")]
#[command(author, version, about = "Shopfloor CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert categories and their products from a YAML file
    Catalog {
        /// Path to the catalog YAML file
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => {
                let summary = commands::seed::catalog(&file).await?;
                tracing::info!(
                    categories = summary.categories,
                    products = summary.products,
                    "Catalog seeded"
                );
            }
        },
    }
    Ok(())
}
