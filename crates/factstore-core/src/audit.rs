//! Append-only audit history of document creates and updates.
//!
//! The write path appends audit records inside the same atomic batch as
//! the document change (see [`DocumentWrite`](crate::store::DocumentWrite)).
//! This type is the read side plus a standalone append; nothing here can
//! modify or remove a record.

use std::sync::Arc;

use crate::error::Result;
use crate::models::AuditRecord;
use crate::store::Store;

pub struct AuditLog<S: Store> {
    store: Arc<S>,
}

impl<S: Store> AuditLog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn append(&self, record: &AuditRecord) -> Result<()> {
        Ok(self.store.append_audit(record).await?)
    }

    /// History of `doc_id`, oldest first.
    pub async fn list_for(&self, doc_id: &str) -> Result<Vec<AuditRecord>> {
        Ok(self.store.audit_trail(doc_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{now, ChangeType};
    use crate::store::memory::InMemoryStore;
    use chrono::Duration;

    fn record(doc_id: &str, change_type: ChangeType, offset_ms: i64) -> AuditRecord {
        AuditRecord {
            doc_id: doc_id.to_string(),
            change_type,
            old_content_hash: None,
            new_content_hash: format!("h{}", offset_ms),
            details: String::new(),
            timestamp: now() + Duration::milliseconds(offset_ms),
        }
    }

    #[tokio::test]
    async fn test_list_for_orders_by_timestamp() {
        let log = AuditLog::new(Arc::new(InMemoryStore::new()));
        log.append(&record("doc1", ChangeType::Update, 50)).await.unwrap();
        log.append(&record("doc1", ChangeType::Create, 0)).await.unwrap();
        log.append(&record("doc2", ChangeType::Create, 10)).await.unwrap();

        let trail = log.list_for("doc1").await.unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].change_type, ChangeType::Create);
        assert_eq!(trail[1].change_type, ChangeType::Update);
    }

    #[tokio::test]
    async fn test_list_for_unknown_document_is_empty() {
        let log = AuditLog::new(Arc::new(InMemoryStore::new()));
        assert!(log.list_for("missing").await.unwrap().is_empty());
    }
}
