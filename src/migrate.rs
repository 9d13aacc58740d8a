use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table, index, and trigger. Safe to run repeatedly.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    // Document dimension
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dim_documents (
            id TEXT PRIMARY KEY,
            source_type TEXT NOT NULL,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            full_text_blob TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            first_seen_at INTEGER NOT NULL,
            last_extracted_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Fact items
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fact_items (
            item_id TEXT PRIMARY KEY,
            doc_id TEXT NOT NULL,
            domain TEXT NOT NULL,
            item_type TEXT NOT NULL,
            content_text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            properties_json TEXT NOT NULL DEFAULT '{}',
            location_pointer TEXT,
            FOREIGN KEY (doc_id) REFERENCES dim_documents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per top-level fact property, for equality filters
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fact_properties (
            item_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value_json TEXT NOT NULL,
            PRIMARY KEY (item_id, key),
            FOREIGN KEY (item_id) REFERENCES fact_items(item_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Audit log
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_document_changes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            doc_id TEXT NOT NULL,
            change_type TEXT NOT NULL CHECK (change_type IN ('create', 'update')),
            old_content_hash TEXT,
            new_content_hash TEXT NOT NULL,
            details TEXT NOT NULL DEFAULT '',
            changed_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for (name, event) in [
        ("audit_document_changes_no_update", "UPDATE"),
        ("audit_document_changes_no_delete", "DELETE"),
    ] {
        sqlx::query(&format!(
            r#"
            CREATE TRIGGER IF NOT EXISTS {name}
            BEFORE {event} ON audit_document_changes
            BEGIN
                SELECT RAISE(ABORT, 'audit_document_changes is append-only');
            END
            "#
        ))
        .execute(pool)
        .await?;
    }

    // Create indexes
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_dim_documents_source_type ON dim_documents(source_type)",
        "CREATE INDEX IF NOT EXISTS idx_dim_documents_first_seen_at ON dim_documents(first_seen_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_fact_items_doc_id ON fact_items(doc_id)",
        "CREATE INDEX IF NOT EXISTS idx_fact_items_domain ON fact_items(domain)",
        "CREATE INDEX IF NOT EXISTS idx_fact_properties_lookup ON fact_properties(key, value_json)",
        "CREATE INDEX IF NOT EXISTS idx_audit_document_changes_doc_id ON audit_document_changes(doc_id, changed_at)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
