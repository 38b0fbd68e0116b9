//! WikiStore CLI
//!
//! Command-line tools for WikiStore databases.
//!
//! # Commands
//!
//! - `demo` - Run the wiki walkthrough against a database
//! - `list` - List wikis
//! - `create-wiki` - Create a wiki and its front page
//! - `pages` - List a wiki's pages by title or by recency
//! - `compact` - Rewrite the log as one snapshot
//! - `inspect` - Display log statistics and records
//! - `verify` - Verify log integrity and schema

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wikistore_core::Config;

/// WikiStore command-line database tools.
#[derive(Parser)]
#[command(name = "wikistore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database file (defaults to wikis.wdb next to the executable)
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create three wikis, rename one, delete one, add pages and list them
    Demo,

    /// List wikis in name order
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Create a wiki and its front page
    CreateWiki {
        /// Wiki name
        name: String,

        /// Wiki description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List the pages of a wiki
    Pages {
        /// Wiki name
        wiki: String,

        /// Order by last update, newest first
        #[arg(short, long)]
        recent: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Rewrite the log as one snapshot transaction
    Compact,

    /// Display log statistics
    Inspect {
        /// Print every record
        #[arg(short, long)]
        records: bool,

        /// Maximum number of records to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify log checksums, transactions and schema
    Verify,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match cli.path {
        Some(path) => Config::new().path(path),
        None => Config::new(),
    };

    match cli.command {
        Commands::Demo => commands::demo::run(config)?,
        Commands::List { format } => commands::wikis::list(config, &format)?,
        Commands::CreateWiki { name, description } => {
            commands::wikis::create(config, &name, &description)?;
        }
        Commands::Pages {
            wiki,
            recent,
            format,
        } => commands::pages::run(config, &wiki, recent, &format)?,
        Commands::Compact => commands::compact::run(config)?,
        Commands::Inspect {
            records,
            limit,
            format,
        } => commands::inspect::run(&config.resolve_path(), records, limit, &format)?,
        Commands::Verify => commands::verify::run(&config.resolve_path())?,
        Commands::Version => {
            println!("WikiStore CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("WikiStore Core v{}", wikistore_core::VERSION);
        }
    }

    Ok(())
}
