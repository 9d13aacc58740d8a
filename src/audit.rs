//! `fstore audit <id>`: print a document's change history.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::documents::format_ts_iso;

pub async fn run_audit(config: &Config, id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let docs = db::document_store(config, pool.clone())?;

    let trail = docs.audit_log().list_for(id).await?;
    pool.close().await;

    if trail.is_empty() {
        println!("No audit history for {}", id);
        return Ok(());
    }

    println!(
        "{:<25} {:<7} {:<17} {:<17} {}",
        "TIMESTAMP", "CHANGE", "OLD HASH", "NEW HASH", "DETAILS"
    );
    println!("{}", "-".repeat(90));
    for record in &trail {
        println!(
            "{:<25} {:<7} {:<17} {:<17} {}",
            format_ts_iso(record.timestamp),
            record.change_type.as_str(),
            record
                .old_content_hash
                .as_deref()
                .map(short_hash)
                .unwrap_or("-"),
            short_hash(&record.new_content_hash),
            record.details
        );
    }
    Ok(())
}

fn short_hash(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}
