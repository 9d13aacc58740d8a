//! # factstore
//!
//! Content-addressed storage for LLM-extracted records.
//!
//! Each source entity is one row in a document dimension, versioned by a
//! fingerprint of its raw content. Its structured record is shredded into
//! atomic fact items under declarative rules, and those facts are served
//! back by exact property match for LLM context assembly. Every create and
//! update lands in an append-only audit log.
//!
//! The storage-independent logic lives in the `factstore-core` crate; this
//! crate adds the SQLite backend, TOML configuration, and the `fstore` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────────────┐   ┌──────────────────┐
//! │ Envelopes  │──▶│ DocumentStore            │──▶│ SQLite           │
//! │ (JSON)     │   │ hash → CDC → shred       │   │ dim_documents    │
//! └────────────┘   └──────────────────────────┘   │ fact_items       │
//!                                                 │ fact_properties  │
//!                  ┌──────────────────────────┐   │ audit_document_… │
//!                  │ RetrievalService         │◀──┤                  │
//!                  │ exact-match filters      │   └──────────────────┘
//!                  └──────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! fstore init
//! fstore ingest ./extractions/policies.json
//! fstore query --filter requirement_type=mandatory --domain IT
//! fstore audit <doc-id>
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and rule book assembly |
//! | [`db`] | Database connection and store wiring |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`models`] | Extraction envelope format |
//! | [`ingest`] | Envelope ingestion |
//! | [`documents`] | Get, list, and delete commands |
//! | [`query`] | Fact retrieval command |
//! | [`audit`] | Audit trail command |
//! | [`stats`] | Database statistics |

pub mod audit;
pub mod config;
pub mod db;
pub mod documents;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod query;
pub mod sqlite_store;
pub mod stats;

pub use factstore_core;
