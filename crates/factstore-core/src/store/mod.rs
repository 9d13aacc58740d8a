//! Storage abstraction for factstore.
//!
//! The [`Store`] trait defines every storage operation the document store,
//! audit log, and retrieval service need, enabling pluggable backends
//! (SQLite in the application crate, [`memory::InMemoryStore`] here).
//!
//! Writes that change a document are submitted as one [`DocumentWrite`]
//! batch. Backends must apply a batch atomically: readers observe either
//! the state before the batch or the state after it, never a document
//! without its facts or a fact set without its audit entry.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    AuditRecord, ContextItem, Document, DocumentState, FactItem, FactQuery, Record,
};

/// New contents for an existing document whose content changed.
#[derive(Debug, Clone)]
pub struct Revision {
    pub doc_id: String,
    /// Version the change was detected against; the stored row must still
    /// be at this version for the batch to apply.
    pub expected_version: i64,
    pub title: String,
    pub metadata: Record,
    pub content: String,
    pub content_hash: String,
    pub extracted_at: DateTime<Utc>,
}

impl Revision {
    pub fn new_version(&self) -> i64 {
        self.expected_version + 1
    }
}

/// One atomic unit of work against the store.
#[derive(Debug, Clone)]
pub enum DocumentWrite {
    /// Insert a document, its facts, and its `create` audit record.
    Create {
        document: Document,
        facts: Vec<FactItem>,
        audit: AuditRecord,
    },
    /// Bump a document's version, replace all of its facts, and append its
    /// `update` audit record.
    Update {
        revision: Revision,
        facts: Vec<FactItem>,
        audit: AuditRecord,
    },
    /// Refresh `last_extracted_at` on an unchanged document.
    Touch { doc_id: String, at: DateTime<Utc> },
}

impl DocumentWrite {
    pub fn doc_id(&self) -> &str {
        match self {
            DocumentWrite::Create { document, .. } => &document.id,
            DocumentWrite::Update { revision, .. } => &revision.doc_id,
            DocumentWrite::Touch { doc_id, .. } => doc_id,
        }
    }
}

/// Whether a [`DocumentWrite`] took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// The stored state no longer matches what the write expected (the
    /// document already exists, moved to another version, or disappeared).
    /// Nothing was written.
    Conflict,
}

/// Abstract storage backend for factstore.
///
/// All operations are async (via `async-trait`). In-memory implementations
/// return immediately-ready futures.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`document_state`](Store::document_state) | Stored hash/type/version for change detection |
/// | [`apply`](Store::apply) | Atomically apply a create, update, or touch |
/// | [`get_document`](Store::get_document) | Retrieve one document |
/// | [`list_documents`](Store::list_documents) | Newest-first document listing |
/// | [`count_documents`](Store::count_documents) | Count documents |
/// | [`delete_document`](Store::delete_document) | Delete a document and its facts |
/// | [`facts_for`](Store::facts_for) | All facts of one document |
/// | [`append_audit`](Store::append_audit) | Append an audit record |
/// | [`audit_trail`](Store::audit_trail) | Audit history of one document |
/// | [`query_facts`](Store::query_facts) | Exact-match fact retrieval joined to documents |
#[async_trait]
pub trait Store: Send + Sync {
    /// Stored change-detection state for a document, if it exists.
    async fn document_state(&self, doc_id: &str) -> Result<Option<DocumentState>>;

    /// Apply one write batch atomically.
    async fn apply(&self, write: &DocumentWrite) -> Result<WriteOutcome>;

    /// Retrieve a document by id.
    async fn get_document(&self, doc_id: &str) -> Result<Option<Document>>;

    /// List documents newest first (`first_seen_at` descending, later
    /// inserts first on ties).
    async fn list_documents(
        &self,
        source_type: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Document>>;

    /// Count documents, optionally of one source type.
    async fn count_documents(&self, source_type: Option<&str>) -> Result<u64>;

    /// Delete a document and all of its facts atomically.
    ///
    /// Returns `false` if no such document existed.
    async fn delete_document(&self, doc_id: &str) -> Result<bool>;

    /// All facts of a document in insertion order.
    async fn facts_for(&self, doc_id: &str) -> Result<Vec<FactItem>>;

    /// Append one audit record.
    async fn append_audit(&self, record: &AuditRecord) -> Result<()>;

    /// Audit records of a document, oldest first.
    async fn audit_trail(&self, doc_id: &str) -> Result<Vec<AuditRecord>>;

    /// Facts matching `query` joined to their documents, in insertion
    /// order, at most `query.limit` of them.
    async fn query_facts(&self, query: &FactQuery) -> Result<Vec<ContextItem>>;
}
