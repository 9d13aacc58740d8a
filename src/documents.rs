//! Document commands: `fstore get`, `fstore list`, `fstore delete`.

use anyhow::Result;

use factstore_core::models::{Document, FactItem};

use crate::config::Config;
use crate::db;

/// A document with its current fact set.
#[derive(Debug, Clone)]
pub struct DocumentView {
    pub document: Document,
    pub facts: Vec<FactItem>,
}

pub async fn get_document(config: &Config, id: &str) -> Result<DocumentView> {
    let pool = db::connect(config).await?;
    let docs = db::document_store(config, pool.clone())?;

    let fetched = async {
        let document = docs.get(id).await?;
        let facts = docs.facts(id).await?;
        Ok::<_, factstore_core::Error>(DocumentView { document, facts })
    }
    .await;

    pool.close().await;
    Ok(fetched?)
}

pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let view = match get_document(config, id).await {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let doc = &view.document;

    println!("--- Document ---");
    println!("id:                {}", doc.id);
    println!("title:             {}", doc.title);
    println!("source_type:       {}", doc.source_type);
    println!("url:               {}", doc.url);
    println!("version:           {}", doc.version);
    println!("content_hash:      {}", doc.content_hash);
    println!("first_seen_at:     {}", format_ts_iso(doc.first_seen_at));
    println!("last_extracted_at: {}", format_ts_iso(doc.last_extracted_at));
    println!("metadata:          {}", serde_json::Value::Object(doc.metadata.clone()));
    println!();

    println!("--- Facts ({}) ---", view.facts.len());
    for fact in &view.facts {
        match &fact.location_pointer {
            Some(loc) => println!("[{} @ {}] {}", fact.item_type, loc, fact.domain),
            None => println!("[{}] {}", fact.item_type, fact.domain),
        }
        println!("{}", fact.content_text);
        if !fact.properties.is_empty() {
            println!("  {}", serde_json::Value::Object(fact.properties.clone()));
        }
        println!();
    }

    Ok(())
}

pub async fn run_list(
    config: &Config,
    source_type: Option<&str>,
    limit: usize,
    offset: usize,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let docs = db::document_store(config, pool.clone())?;

    let page = docs.list(source_type, limit, offset).await?;
    let total = docs.count(source_type).await?;

    if page.is_empty() {
        println!("No documents.");
    } else {
        println!(
            "{:<16} {:<12} {:>4}  {:<17} {}",
            "ID", "TYPE", "VER", "FIRST SEEN", "TITLE"
        );
        println!("{}", "-".repeat(80));
        for doc in &page {
            println!(
                "{:<16} {:<12} {:>4}  {:<17} {}",
                short_id(&doc.id),
                doc.source_type,
                doc.version,
                doc.first_seen_at.format("%Y-%m-%d %H:%M"),
                doc.title
            );
        }
    }
    println!();
    println!("showing {} of {} document(s)", page.len(), total);

    pool.close().await;
    Ok(())
}

pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let docs = db::document_store(config, pool.clone())?;

    let existed = docs.delete(id).await?;
    pool.close().await;

    if existed {
        println!("deleted {}", id);
    } else {
        println!("no document {}", id);
    }
    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..16).unwrap_or(id)
}

pub(crate) fn format_ts_iso(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
