//! Change data capture: decide whether incoming content is new, changed,
//! or identical to what is stored.

use crate::error::Result;
use crate::models::DocumentState;
use crate::store::Store;

/// Classification of an incoming `(doc_id, content_hash)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
    /// No document with this id is stored.
    New,
    /// A document is stored with a different content hash.
    Changed { previous: DocumentState },
    /// A document is stored with the same content hash.
    Unchanged { previous: DocumentState },
}

impl ChangeStatus {
    pub fn is_new(&self) -> bool {
        matches!(self, ChangeStatus::New)
    }

    pub fn has_changed(&self) -> bool {
        matches!(self, ChangeStatus::Changed { .. })
    }

    /// Stored state the classification was made against.
    pub fn previous(&self) -> Option<&DocumentState> {
        match self {
            ChangeStatus::New => None,
            ChangeStatus::Changed { previous } | ChangeStatus::Unchanged { previous } => {
                Some(previous)
            }
        }
    }
}

/// Read-only change detector over a [`Store`].
pub struct ChangeDetector<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> ChangeDetector<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Compare `new_content_hash` against the stored hash for `doc_id`.
    pub async fn classify(&self, doc_id: &str, new_content_hash: &str) -> Result<ChangeStatus> {
        let status = match self.store.document_state(doc_id).await? {
            None => ChangeStatus::New,
            Some(previous) if previous.content_hash != new_content_hash => {
                ChangeStatus::Changed { previous }
            }
            Some(previous) => ChangeStatus::Unchanged { previous },
        };
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{now, AuditRecord, ChangeType, Document, Record};
    use crate::store::memory::InMemoryStore;
    use crate::store::DocumentWrite;

    async fn seeded_store(hash: &str) -> InMemoryStore {
        let store = InMemoryStore::new();
        let ts = now();
        let write = DocumentWrite::Create {
            document: Document {
                id: "doc1".into(),
                source_type: "policy".into(),
                title: "T".into(),
                url: "http://x".into(),
                metadata: Record::new(),
                content: "v1".into(),
                content_hash: hash.into(),
                version: 1,
                first_seen_at: ts,
                last_extracted_at: ts,
            },
            facts: Vec::new(),
            audit: AuditRecord {
                doc_id: "doc1".into(),
                change_type: ChangeType::Create,
                old_content_hash: None,
                new_content_hash: hash.into(),
                details: "Initial extraction".into(),
                timestamp: ts,
            },
        };
        store.apply(&write).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_classify_new() {
        let store = InMemoryStore::new();
        let status = ChangeDetector::new(&store).classify("doc1", "h1").await.unwrap();
        assert_eq!(status, ChangeStatus::New);
        assert!(status.is_new());
        assert!(!status.has_changed());
        assert!(status.previous().is_none());
    }

    #[tokio::test]
    async fn test_classify_changed() {
        let store = seeded_store("h1").await;
        let status = ChangeDetector::new(&store).classify("doc1", "h2").await.unwrap();
        assert!(!status.is_new());
        assert!(status.has_changed());
        let previous = status.previous().unwrap();
        assert_eq!(previous.content_hash, "h1");
        assert_eq!(previous.version, 1);
        assert_eq!(previous.source_type, "policy");
    }

    #[tokio::test]
    async fn test_classify_unchanged_is_repeatable() {
        let store = seeded_store("h1").await;
        let detector = ChangeDetector::new(&store);
        for _ in 0..3 {
            let status = detector.classify("doc1", "h1").await.unwrap();
            assert!(!status.is_new());
            assert!(!status.has_changed());
        }
        assert_eq!(store.document_state("doc1").await.unwrap().unwrap().version, 1);
    }
}
