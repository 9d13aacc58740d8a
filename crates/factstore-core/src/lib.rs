//! # factstore core
//!
//! Runtime-agnostic logic for factstore: content fingerprints, record
//! shredding, change detection, the store abstraction, and the document,
//! audit, and retrieval services built on top of it.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. The SQLite
//! backend, configuration, and CLI live in the `factstore` application
//! crate.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use factstore_core::documents::DocumentStore;
//! use factstore_core::embedding::PlaceholderEmbedder;
//! use factstore_core::models::{FactQuery, UpsertRequest, UpsertStatus};
//! use factstore_core::shred::{RuleBook, Shredder};
//! use factstore_core::store::memory::InMemoryStore;
//! use serde_json::json;
//!
//! # async fn demo() -> factstore_core::Result<()> {
//! let docs = DocumentStore::new(
//!     Arc::new(InMemoryStore::new()),
//!     Shredder::new(RuleBook::with_defaults(), Arc::new(PlaceholderEmbedder::default())),
//! );
//! let record = json!({"requirements": [{"statement": "A", "requirement_type": "mandatory"}]});
//! let outcome = docs
//!     .upsert(UpsertRequest {
//!         doc_id: "doc1".into(),
//!         source_type: "policy".into(),
//!         title: "Policy".into(),
//!         url: "http://example.com".into(),
//!         metadata: Default::default(),
//!         domain: "IT".into(),
//!         content: "v1".into(),
//!         record: record.as_object().cloned().unwrap_or_default(),
//!     })
//!     .await?;
//! assert_eq!(outcome.status, UpsertStatus::Created);
//!
//! let hits = docs
//!     .retrieval()
//!     .query(&FactQuery::new(5).filter("requirement_type", "mandatory"))
//!     .await?;
//! assert_eq!(hits.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod cdc;
pub mod documents;
pub mod embedding;
pub mod error;
pub mod hash;
pub mod models;
pub mod retrieval;
pub mod shred;
pub mod store;

pub use error::{Error, Result};
