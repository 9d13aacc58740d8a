//! Ingestion of extraction envelopes.
//!
//! Reads one envelope or an array of envelopes from a JSON file, resolves
//! ids, titles, and domains, and upserts each through the
//! [`DocumentStore`]. Unchanged content is a no-op touch; changed content
//! bumps the version and replaces the document's facts.

use anyhow::Result;
use std::path::Path;
use tracing::warn;

use factstore_core::documents::DocumentStore;
use factstore_core::models::UpsertStatus;
use factstore_core::shred::Shredder;
use factstore_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::models::{read_envelopes, Envelope};

/// Counters for one ingest run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub envelopes: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub facts_written: usize,
    pub mismatches: usize,
}

/// Upsert every envelope in order. Stops at the first error.
pub async fn ingest_envelopes<S: Store>(
    docs: &DocumentStore<S>,
    envelopes: Vec<Envelope>,
    domain_fields: &[String],
) -> Result<IngestStats> {
    let mut stats = IngestStats {
        envelopes: envelopes.len(),
        ..IngestStats::default()
    };

    for envelope in envelopes {
        let req = envelope.into_request(domain_fields)?;
        let outcome = docs.upsert(req).await?;

        match outcome.status {
            UpsertStatus::Created => stats.created += 1,
            UpsertStatus::Updated => stats.updated += 1,
            UpsertStatus::Unchanged => stats.unchanged += 1,
        }
        stats.facts_written += outcome.facts_written;
        stats.mismatches += outcome.mismatches.len();
    }

    Ok(stats)
}

pub async fn run_ingest(config: &Config, path: &Path, dry_run: bool) -> Result<()> {
    let envelopes = read_envelopes(path)?;

    if dry_run {
        let shredder = Shredder::new(config.shredding.rule_book(), config.embedding.embedder()?);
        let mut facts = 0usize;
        let mut mismatches = 0usize;
        for envelope in &envelopes {
            let req = envelope.clone().into_request(&config.shredding.domain_fields)?;
            let outcome = shredder.shred(&req.doc_id, &req.domain, &req.record)?;
            facts += outcome.items.len();
            for mismatch in &outcome.mismatches {
                warn!(doc_id = %req.doc_id, %mismatch, "would skip element");
            }
            mismatches += outcome.mismatches.len();
        }
        println!("ingest {} (dry-run)", path.display());
        println!("  envelopes: {}", envelopes.len());
        println!("  facts: {}", facts);
        println!("  schema mismatches: {}", mismatches);
        return Ok(());
    }

    let pool = db::connect(config).await?;
    let docs = db::document_store(config, pool.clone())?;
    let stats = ingest_envelopes(&docs, envelopes, &config.shredding.domain_fields).await?;

    println!("ingest {}", path.display());
    println!("  envelopes: {}", stats.envelopes);
    println!("  created: {}", stats.created);
    println!("  updated: {}", stats.updated);
    println!("  unchanged: {}", stats.unchanged);
    println!("  facts written: {}", stats.facts_written);
    println!("  schema mismatches: {}", stats.mismatches);
    println!("ok");

    pool.close().await;
    Ok(())
}
