//! One-shot pipeline runs from the command line.
//!
//! Prints the same text the HTTP triggers return.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use watchman::Source;
use watchman_server::{Config, Watchman};

#[derive(Parser)]
#[command(name = "watchman_cli")]
#[command(about = "Run a single Watchman ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load new and hot posts from the configured communities
    Reddit,

    /// Load recent tweets for the configured hashtags
    Twitter,

    /// Load close prices for one round, plus trending tickers on round 1
    YahooFinance {
        #[arg(long, default_value_t = 1)]
        round: usize,
    },

    /// Create or update the destination tables
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,watchman=debug,sqlx=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let (source, round) = match cli.command {
        Commands::Migrate => {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            println!("Migrations complete");
            return Ok(());
        }
        Commands::Reddit => (Source::Reddit, None),
        Commands::Twitter => (Source::Twitter, None),
        Commands::YahooFinance { round } => (Source::YahooFinance, Some(round)),
    };

    let watchman = Watchman::connect(config, pool).context("Failed to build HTTP client")?;
    println!("{}", watchman.trigger(source, round).await);

    Ok(())
}
