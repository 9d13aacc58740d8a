//! In-memory [`Store`] implementation for testing and embedding in tools.
//!
//! All three tables live behind one `std::sync::RwLock`, so a
//! [`DocumentWrite`] is applied inside a single write-lock critical section
//! and readers never see a half-applied batch. Fact filtering is a linear
//! scan.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{AuditRecord, ContextItem, Document, DocumentState, FactItem, FactQuery};

use super::{DocumentWrite, Store, WriteOutcome};

struct StoredDoc {
    doc: Document,
    seq: u64,
}

#[derive(Default)]
struct Tables {
    docs: HashMap<String, StoredDoc>,
    facts: Vec<FactItem>,
    audit: Vec<AuditRecord>,
    next_seq: u64,
}

/// In-memory store for tests and short-lived pipelines.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn document_state(&self, doc_id: &str) -> Result<Option<DocumentState>> {
        let tables = self.read()?;
        Ok(tables.docs.get(doc_id).map(|s| DocumentState {
            content_hash: s.doc.content_hash.clone(),
            source_type: s.doc.source_type.clone(),
            version: s.doc.version,
        }))
    }

    async fn apply(&self, write: &DocumentWrite) -> Result<WriteOutcome> {
        let mut tables = self.write()?;
        match write {
            DocumentWrite::Create {
                document,
                facts,
                audit,
            } => {
                if tables.docs.contains_key(&document.id) {
                    return Ok(WriteOutcome::Conflict);
                }
                let seq = tables.next_seq;
                tables.next_seq += 1;
                tables.docs.insert(
                    document.id.clone(),
                    StoredDoc {
                        doc: document.clone(),
                        seq,
                    },
                );
                tables.facts.extend(facts.iter().cloned());
                tables.audit.push(audit.clone());
            }
            DocumentWrite::Update {
                revision,
                facts,
                audit,
            } => {
                match tables.docs.get_mut(&revision.doc_id) {
                    Some(stored) if stored.doc.version == revision.expected_version => {
                        let doc = &mut stored.doc;
                        doc.title = revision.title.clone();
                        doc.metadata = revision.metadata.clone();
                        doc.content = revision.content.clone();
                        doc.content_hash = revision.content_hash.clone();
                        doc.version = revision.new_version();
                        doc.last_extracted_at = revision.extracted_at;
                    }
                    _ => return Ok(WriteOutcome::Conflict),
                }
                tables.facts.retain(|f| f.doc_id != revision.doc_id);
                tables.facts.extend(facts.iter().cloned());
                tables.audit.push(audit.clone());
            }
            DocumentWrite::Touch { doc_id, at } => match tables.docs.get_mut(doc_id) {
                Some(stored) => stored.doc.last_extracted_at = *at,
                None => return Ok(WriteOutcome::Conflict),
            },
        }
        Ok(WriteOutcome::Applied)
    }

    async fn get_document(&self, doc_id: &str) -> Result<Option<Document>> {
        let tables = self.read()?;
        Ok(tables.docs.get(doc_id).map(|s| s.doc.clone()))
    }

    async fn list_documents(
        &self,
        source_type: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Document>> {
        let tables = self.read()?;
        let mut matching: Vec<&StoredDoc> = tables
            .docs
            .values()
            .filter(|s| source_type.map_or(true, |t| s.doc.source_type == t))
            .collect();
        matching.sort_by(|a, b| {
            b.doc
                .first_seen_at
                .cmp(&a.doc.first_seen_at)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|s| s.doc.clone())
            .collect())
    }

    async fn count_documents(&self, source_type: Option<&str>) -> Result<u64> {
        let tables = self.read()?;
        Ok(tables
            .docs
            .values()
            .filter(|s| source_type.map_or(true, |t| s.doc.source_type == t))
            .count() as u64)
    }

    async fn delete_document(&self, doc_id: &str) -> Result<bool> {
        let mut tables = self.write()?;
        tables.facts.retain(|f| f.doc_id != doc_id);
        Ok(tables.docs.remove(doc_id).is_some())
    }

    async fn facts_for(&self, doc_id: &str) -> Result<Vec<FactItem>> {
        let tables = self.read()?;
        Ok(tables
            .facts
            .iter()
            .filter(|f| f.doc_id == doc_id)
            .cloned()
            .collect())
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<()> {
        self.write()?.audit.push(record.clone());
        Ok(())
    }

    async fn audit_trail(&self, doc_id: &str) -> Result<Vec<AuditRecord>> {
        let tables = self.read()?;
        let mut trail: Vec<AuditRecord> = tables
            .audit
            .iter()
            .filter(|r| r.doc_id == doc_id)
            .cloned()
            .collect();
        // Stable sort keeps append order for equal timestamps.
        trail.sort_by_key(|r| r.timestamp);
        Ok(trail)
    }

    async fn query_facts(&self, query: &FactQuery) -> Result<Vec<ContextItem>> {
        let tables = self.read()?;
        Ok(tables
            .facts
            .iter()
            .filter(|f| query.matches(f))
            .filter_map(|f| {
                tables
                    .docs
                    .get(&f.doc_id)
                    .map(|s| ContextItem::from_parts(f, &s.doc))
            })
            .take(query.limit)
            .collect())
    }
}
