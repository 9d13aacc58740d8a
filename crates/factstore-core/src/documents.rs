//! Document dimension: idempotent upsert with change detection.
//!
//! [`DocumentStore::upsert`] is the single write entry point:
//!
//! 1. Fingerprint the raw content.
//! 2. Classify it against the stored hash ([`ChangeDetector`]).
//! 3. **New**: insert the document at version 1, its shredded facts, and a
//!    `create` audit record.
//! 4. **Changed**: bump the version, replace the full fact set, and append
//!    an `update` audit record carrying the old and new hashes.
//! 5. **Unchanged**: only refresh `last_extracted_at`.
//!
//! Steps 3 and 4 are each submitted as one [`DocumentWrite`] batch, which
//! every backend applies atomically. Concurrent upserts of the *same*
//! document must be serialized by the caller; if they are not, the loser
//! of the race gets [`Error::InvariantViolation`] and writes nothing.

use std::sync::Arc;

use tracing::{debug, info};

use crate::audit::AuditLog;
use crate::cdc::{ChangeDetector, ChangeStatus};
use crate::error::{Error, Result};
use crate::hash;
use crate::models::{
    now, AuditRecord, ChangeType, Document, FactItem, Record, UpsertRequest, UpsertStatus,
};
use crate::retrieval::RetrievalService;
use crate::shred::{build_metadata, SchemaMismatch, Shredder};
use crate::store::{DocumentWrite, Revision, Store, WriteOutcome};

/// Record fields kept out of document metadata by default: bulk text that
/// is already stored as the document's content.
pub const DEFAULT_EXCLUDED_METADATA_KEYS: [&str; 2] = ["content", "paragraphs"];

/// What an upsert did.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub doc_id: String,
    pub status: UpsertStatus,
    /// Document version after the upsert.
    pub version: i64,
    /// Facts written by this upsert (0 when unchanged).
    pub facts_written: usize,
    /// Elements skipped during shredding.
    pub mismatches: Vec<SchemaMismatch>,
}

/// Owns the document dimension and orchestrates create/update/no-op.
pub struct DocumentStore<S: Store> {
    store: Arc<S>,
    shredder: Shredder,
    excluded_metadata_keys: Vec<String>,
}

impl<S: Store> DocumentStore<S> {
    pub fn new(store: Arc<S>, shredder: Shredder) -> Self {
        Self {
            store,
            shredder,
            excluded_metadata_keys: DEFAULT_EXCLUDED_METADATA_KEYS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }

    /// Replace the record fields that never land in document metadata.
    pub fn with_excluded_metadata_keys(mut self, keys: Vec<String>) -> Self {
        self.excluded_metadata_keys = keys;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn shredder(&self) -> &Shredder {
        &self.shredder
    }

    /// Audit log over the same backend.
    pub fn audit_log(&self) -> AuditLog<S> {
        AuditLog::new(Arc::clone(&self.store))
    }

    /// Retrieval service over the same backend.
    pub fn retrieval(&self) -> RetrievalService<S> {
        RetrievalService::new(Arc::clone(&self.store))
    }

    /// Store one extracted entity, creating, updating, or touching it.
    pub async fn upsert(&self, req: UpsertRequest) -> Result<UpsertOutcome> {
        let content_hash = hash::content_hash(&req.content);
        let status = ChangeDetector::new(self.store.as_ref())
            .classify(&req.doc_id, &content_hash)
            .await?;

        if let Some(previous) = status.previous() {
            if previous.source_type != req.source_type {
                return Err(Error::InvariantViolation(format!(
                    "document {} is stored as source type '{}', not '{}'",
                    req.doc_id, previous.source_type, req.source_type
                )));
            }
        }

        let ts = now();
        match status {
            ChangeStatus::Unchanged { previous } => {
                debug!(doc_id = %req.doc_id, version = previous.version, "content unchanged");
                let write = DocumentWrite::Touch {
                    doc_id: req.doc_id.clone(),
                    at: ts,
                };
                self.submit(&write).await?;
                Ok(UpsertOutcome {
                    doc_id: req.doc_id,
                    status: UpsertStatus::Unchanged,
                    version: previous.version,
                    facts_written: 0,
                    mismatches: Vec::new(),
                })
            }
            ChangeStatus::New => {
                let (facts, mismatches) = self.shred(&req)?;
                let metadata = self.metadata_for(&req);
                let facts_written = facts.len();
                let write = DocumentWrite::Create {
                    document: Document {
                        id: req.doc_id.clone(),
                        source_type: req.source_type.clone(),
                        title: req.title.clone(),
                        url: req.url.clone(),
                        metadata,
                        content: req.content.clone(),
                        content_hash: content_hash.clone(),
                        version: 1,
                        first_seen_at: ts,
                        last_extracted_at: ts,
                    },
                    facts,
                    audit: AuditRecord {
                        doc_id: req.doc_id.clone(),
                        change_type: ChangeType::Create,
                        old_content_hash: None,
                        new_content_hash: content_hash,
                        details: "Initial extraction".to_string(),
                        timestamp: ts,
                    },
                };
                self.submit(&write).await?;
                info!(doc_id = %req.doc_id, facts = facts_written, "document created");
                Ok(UpsertOutcome {
                    doc_id: req.doc_id,
                    status: UpsertStatus::Created,
                    version: 1,
                    facts_written,
                    mismatches,
                })
            }
            ChangeStatus::Changed { previous } => {
                let (facts, mismatches) = self.shred(&req)?;
                let revision = Revision {
                    doc_id: req.doc_id.clone(),
                    expected_version: previous.version,
                    title: req.title.clone(),
                    metadata: self.metadata_for(&req),
                    content: req.content.clone(),
                    content_hash: content_hash.clone(),
                    extracted_at: ts,
                };
                let version = revision.new_version();
                let facts_written = facts.len();
                let write = DocumentWrite::Update {
                    revision,
                    facts,
                    audit: AuditRecord {
                        doc_id: req.doc_id.clone(),
                        change_type: ChangeType::Update,
                        old_content_hash: Some(previous.content_hash),
                        new_content_hash: content_hash,
                        details: format!("Updated to version {}", version),
                        timestamp: ts,
                    },
                };
                self.submit(&write).await?;
                info!(doc_id = %req.doc_id, version, facts = facts_written, "document updated");
                Ok(UpsertOutcome {
                    doc_id: req.doc_id,
                    status: UpsertStatus::Updated,
                    version,
                    facts_written,
                    mismatches,
                })
            }
        }
    }

    /// Fetch a document, or [`Error::NotFound`].
    pub async fn get(&self, doc_id: &str) -> Result<Document> {
        self.store
            .get_document(doc_id)
            .await?
            .ok_or_else(|| Error::NotFound(doc_id.to_string()))
    }

    /// Documents newest first, optionally of one source type.
    pub async fn list(
        &self,
        source_type: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Document>> {
        Ok(self.store.list_documents(source_type, limit, offset).await?)
    }

    pub async fn count(&self, source_type: Option<&str>) -> Result<u64> {
        Ok(self.store.count_documents(source_type).await?)
    }

    /// Current fact set of a document, in insertion order.
    pub async fn facts(&self, doc_id: &str) -> Result<Vec<FactItem>> {
        Ok(self.store.facts_for(doc_id).await?)
    }

    /// Delete a document and all its facts. Returns whether it existed.
    ///
    /// Audit history is kept.
    pub async fn delete(&self, doc_id: &str) -> Result<bool> {
        let existed = self.store.delete_document(doc_id).await?;
        if existed {
            info!(doc_id, "document deleted");
        }
        Ok(existed)
    }

    fn shred(&self, req: &UpsertRequest) -> Result<(Vec<FactItem>, Vec<SchemaMismatch>)> {
        let outcome = self
            .shredder
            .shred(&req.doc_id, &req.domain, &req.record)?;
        Ok((outcome.items, outcome.mismatches))
    }

    fn metadata_for(&self, req: &UpsertRequest) -> Record {
        let consumed = self.shredder.consumed_keys(&req.domain, &req.record);
        build_metadata(
            &req.metadata,
            &req.record,
            &consumed,
            &self.excluded_metadata_keys,
        )
    }

    async fn submit(&self, write: &DocumentWrite) -> Result<()> {
        match self.store.apply(write).await? {
            WriteOutcome::Applied => Ok(()),
            WriteOutcome::Conflict => Err(Error::InvariantViolation(format!(
                "document {} was modified concurrently; serialize upserts per document",
                write.doc_id()
            ))),
        }
    }
}
