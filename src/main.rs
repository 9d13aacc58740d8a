//! # factstore CLI (`fstore`)
//!
//! The `fstore` binary stores LLM-extracted records: it fingerprints the raw
//! content, detects changes, shreds each record into atomic facts, and
//! serves those facts back by exact property match.
//!
//! ## Usage
//!
//! ```bash
//! fstore --config ./config/fstore.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fstore init` | Create the SQLite database and run schema migrations |
//! | `fstore ingest <file>` | Upsert extraction envelopes from a JSON file |
//! | `fstore get <id>` | Print a document and its facts |
//! | `fstore list` | List documents, newest first |
//! | `fstore delete <id>` | Delete a document and its facts |
//! | `fstore query` | Retrieve facts by property filters as JSON |
//! | `fstore audit <id>` | Print a document's change history |
//! | `fstore stats` | Document, fact, and audit counts |
//!
//! ## Examples
//!
//! ```bash
//! fstore init
//! fstore ingest ./extractions/policies.json
//! fstore query --filter requirement_type=mandatory --domain IT --limit 10
//! RUST_LOG=factstore_core=debug fstore ingest ./extractions/policies.json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use factstore::{audit, config, documents, ingest, migrate, query, stats};

/// factstore CLI: change-detected storage and exact-match retrieval of
/// LLM-extracted facts.
#[derive(Parser)]
#[command(
    name = "fstore",
    about = "factstore: shred LLM-extracted records into queryable facts",
    version,
    long_about = "factstore keeps one document row per source entity, versions it by content \
    fingerprint, shreds its structured record into atomic fact items under declarative rules, \
    and retrieves those facts by exact property match for LLM context assembly."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/fstore.toml")]
    config: PathBuf,

    /// Log filter (e.g. `debug`, `factstore_core=debug`). Overrides `RUST_LOG`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all tables and indexes. Safe
    /// to run repeatedly.
    Init,

    /// Upsert extraction envelopes from a JSON file.
    ///
    /// The file holds one envelope object or an array of them. Unchanged
    /// content is a no-op; changed content bumps the document version and
    /// replaces its facts.
    Ingest {
        /// Path to the envelope JSON file.
        path: PathBuf,

        /// Shred and count without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a document and its facts.
    Get {
        /// Document id.
        id: String,
    },

    /// List documents, newest first.
    List {
        /// Only documents of this source type.
        #[arg(long)]
        source_type: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Delete a document and all of its facts. Audit history is kept.
    Delete {
        /// Document id.
        id: String,
    },

    /// Retrieve facts by exact property match, printed as JSON.
    Query {
        /// Property filter as `key=value`. Repeatable; all must match.
        /// Values that parse as JSON are matched as JSON, others as strings,
        /// so `number=3` matches the number 3 only. Quote to match a string:
        /// `number='"3"'`.
        #[arg(long = "filter", value_parser = parse_key_val)]
        filters: Vec<(String, String)>,

        /// Only facts in this domain.
        #[arg(long)]
        domain: Option<String>,

        /// Maximum number of items (defaults to `retrieval.default_limit`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print a document's audit trail, oldest first.
    Audit {
        /// Document id.
        id: String,
    },

    /// Show document, fact, and audit counts.
    Stats,
}

/// Parse a `key=value` pair for `--filter` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    let key = s[..pos].trim();
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{}'", s));
    }
    Ok((key.to_string(), s[pos + 1..].to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { path, dry_run } => {
            ingest::run_ingest(&cfg, &path, dry_run).await?;
        }
        Commands::Get { id } => {
            documents::run_get(&cfg, &id).await?;
        }
        Commands::List {
            source_type,
            limit,
            offset,
        } => {
            documents::run_list(&cfg, source_type.as_deref(), limit, offset).await?;
        }
        Commands::Delete { id } => {
            documents::run_delete(&cfg, &id).await?;
        }
        Commands::Query {
            filters,
            domain,
            limit,
        } => {
            query::run_query(&cfg, &filters, domain.as_deref(), limit).await?;
        }
        Commands::Audit { id } => {
            audit::run_audit(&cfg, &id).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
