use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use factstore_core::documents::DocumentStore;
use factstore_core::shred::Shredder;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Wire a [`DocumentStore`] over the configured database, rule book,
/// embedder, and metadata exclusions.
pub fn document_store(config: &Config, pool: SqlitePool) -> Result<DocumentStore<SqliteStore>> {
    let shredder = Shredder::new(
        config.shredding.rule_book(),
        config.embedding.embedder()?,
    );
    Ok(
        DocumentStore::new(Arc::new(SqliteStore::new(pool)), shredder)
            .with_excluded_metadata_keys(config.shredding.excluded_metadata_keys.clone()),
    )
}
