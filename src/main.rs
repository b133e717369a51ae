//! # AgroMark CLI (`agromark`)
//!
//! ## Usage
//!
//! ```bash
//! agromark --config ./config/agromark.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `agromark init` | Create the SQLite database, run migrations, seed categories |
//! | `agromark seed` | Insert demo counterparties and movements |
//! | `agromark ask "<question>"` | Answer one question and print it |
//! | `agromark cache rebuild` | Force an embedding cache rebuild |
//! | `agromark serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! agromark init
//! agromark seed
//! agromark ask "Quantos fornecedores existem?"
//! agromark ask "e quanto gastamos com eles?" --history ./conversa.json
//! RUST_LOG=agromark_core=debug agromark serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use agromark::{ask, cache_cmd, config, logging, seed, server};

/// AgroMark: ask questions about your farm's ledger in plain Portuguese.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/agromark.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "agromark",
    about = "AgroMark: a chat agent over an agribusiness accounts ledger",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/agromark.toml")]
    config: PathBuf,

    /// Log filter directive (e.g. `debug`, `agromark_core=trace`).
    /// Overrides `RUST_LOG`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema and default categories.
    ///
    /// Idempotent: running it again changes nothing.
    Init,

    /// Insert demo counterparties, movements and installments.
    Seed,

    /// Answer a single question and print the answer.
    Ask {
        /// The question, in natural language.
        query: String,

        /// JSON file with prior turns: `[{"sender": "user", "text": "..."}]`.
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Embedding cache management.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Re-read the ledger and re-embed every summary.
    Rebuild,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let inserted = seed::run_init(&cfg).await?;
            println!("Database initialized successfully.");
            println!("  categories added: {}", inserted);
        }
        Commands::Seed => {
            let report = seed::run_seed_demo(&cfg).await?;
            println!("Demo data seeded.");
            println!("  people:       {}", report.people);
            println!("  movements:    {}", report.movements);
            println!("  installments: {}", report.installments);
        }
        Commands::Ask { query, history } => {
            ask::run_ask(&cfg, &query, history.as_deref()).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Rebuild => {
                cache_cmd::run_cache_rebuild(&cfg).await?;
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
