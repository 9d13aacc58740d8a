//! Database statistics and health overview.
//!
//! Summarizes what is stored: document, fact, and audit counts with a
//! per-source-type breakdown and the time of the most recent extraction.
//! Used by `fstore stats`.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;

/// Per-source-type breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTypeStats {
    pub source_type: String,
    pub doc_count: i64,
    pub fact_count: i64,
    /// Most recent `last_extracted_at`, Unix milliseconds.
    pub last_extracted_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub total_docs: i64,
    pub total_facts: i64,
    pub total_audit: i64,
    pub by_source_type: Vec<SourceTypeStats>,
}

pub async fn collect_stats(pool: &SqlitePool) -> Result<StoreStats> {
    let total_docs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dim_documents")
        .fetch_one(pool)
        .await?;

    let total_facts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fact_items")
        .fetch_one(pool)
        .await?;

    let total_audit: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_document_changes")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(
        r#"
        SELECT
            d.source_type,
            COUNT(DISTINCT d.id) AS doc_count,
            COUNT(f.item_id) AS fact_count,
            MAX(d.last_extracted_at) AS last_extracted_ms
        FROM dim_documents d
        LEFT JOIN fact_items f ON f.doc_id = d.id
        GROUP BY d.source_type
        ORDER BY doc_count DESC, d.source_type ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let by_source_type = rows
        .iter()
        .map(|row| SourceTypeStats {
            source_type: row.get("source_type"),
            doc_count: row.get("doc_count"),
            fact_count: row.get("fact_count"),
            last_extracted_ms: row.get("last_extracted_ms"),
        })
        .collect();

    Ok(StoreStats {
        total_docs,
        total_facts,
        total_audit,
        by_source_type,
    })
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let stats = collect_stats(&pool).await?;
    pool.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("factstore database stats");
    println!("========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", stats.total_docs);
    println!("  Facts:       {}", stats.total_facts);
    println!("  Audit rows:  {}", stats.total_audit);

    if !stats.by_source_type.is_empty() {
        println!();
        println!("  By source type:");
        println!(
            "  {:<24} {:>6} {:>8}   {}",
            "SOURCE TYPE", "DOCS", "FACTS", "LAST EXTRACTED"
        );
        println!("  {}", "-".repeat(66));

        let now_ms = chrono::Utc::now().timestamp_millis();
        for s in &stats.by_source_type {
            println!(
                "  {:<24} {:>6} {:>8}   {}",
                s.source_type,
                s.doc_count,
                s.fact_count,
                format_age(s.last_extracted_ms, now_ms)
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

/// Compact age of a millisecond timestamp, e.g. "3h ago".
fn format_age(ms: i64, now_ms: i64) -> String {
    let secs = (now_ms - ms).max(0) / 1000;
    match secs {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
