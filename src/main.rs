use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use newswire::config::Config;
use newswire::ingest;
use newswire::provider::{ProviderKey, ProviderRegistry};
use newswire::storage::{Database, DatabaseError};

#[derive(Parser, Debug)]
#[command(name = "newswire", about = "Multi-provider news ingestion pipeline")]
struct Args {
    /// Path to the configuration file
    #[arg(long, value_name = "FILE", default_value = "newswire.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and store articles from the configured providers
    Fetch {
        /// Run only this provider (key such as news_data)
        #[arg(long, value_name = "KEY")]
        provider: Option<ProviderKey>,
    },
    /// Create the database file and schema, then exit
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = Config::load(&args.config).context("Failed to load configuration")?;

    // Open database
    let db = match Database::open(&config.database_path).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of newswire appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    match args.command {
        Command::Init => {
            // Opening already ran the migrations.
            println!("Database ready at {}", config.database_path);
        }
        Command::Fetch { provider } => {
            let registry =
                ProviderRegistry::from_config(&config).context("Failed to build providers")?;
            if registry.is_empty() {
                eprintln!(
                    "No providers configured. Add an api_token to {} and retry.",
                    args.config.display()
                );
                std::process::exit(1);
            }

            let summaries = match provider {
                Some(key) => match ingest::run_provider(&registry, &db, key).await {
                    Some(summary) => vec![summary],
                    None => {
                        eprintln!("Provider `{}` has no API token configured.", key);
                        std::process::exit(1);
                    }
                },
                None => ingest::run_all(&registry, &db).await,
            };

            for summary in &summaries {
                println!(
                    "{}: {} stored, {} failed across {} requests",
                    summary.provider.label(),
                    summary.stored,
                    summary.failed,
                    summary.pages
                );
            }
        }
    }

    Ok(())
}
