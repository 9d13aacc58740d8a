//! Core data models: the Document dimension, FactItem facts, audit records,
//! and the request/response types that flow through the store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A schema-agnostic structured record: string keys to arbitrary JSON values.
pub type Record = serde_json::Map<String, Value>;

/// Current time truncated to millisecond precision, the resolution every
/// backend persists timestamps at.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// One row of the document dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_type: String,
    pub title: String,
    pub url: String,
    pub metadata: Record,
    pub content: String,
    pub content_hash: String,
    pub version: i64,
    pub first_seen_at: DateTime<Utc>,
    pub last_extracted_at: DateTime<Utc>,
}

/// An atomic fact shredded out of a document's structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactItem {
    pub id: String,
    pub doc_id: String,
    pub domain: String,
    pub item_type: String,
    pub content_text: String,
    pub embedding: Vec<f32>,
    pub properties: Record,
    pub location_pointer: Option<String>,
}

/// Kind of lifecycle transition recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Update,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "create" => Ok(ChangeType::Create),
            "update" => Ok(ChangeType::Update),
            other => anyhow::bail!("Unknown change type: {}", other),
        }
    }
}

/// Append-only record of a document create or update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub doc_id: String,
    pub change_type: ChangeType,
    pub old_content_hash: Option<String>,
    pub new_content_hash: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

/// The slice of a stored document that change detection needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentState {
    pub content_hash: String,
    pub source_type: String,
    pub version: i64,
}

/// Everything needed to store one extracted entity.
#[derive(Debug, Clone)]
pub struct UpsertRequest {
    pub doc_id: String,
    pub source_type: String,
    pub title: String,
    pub url: String,
    /// Auxiliary fields supplied by the caller (extraction model, run id, ...).
    pub metadata: Record,
    /// Partition label written onto every fact item.
    pub domain: String,
    /// Raw content the document's change signal is computed from.
    pub content: String,
    /// The structured record to shred.
    pub record: Record,
}

/// Which path an upsert took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertStatus {
    Created,
    Updated,
    Unchanged,
}

impl fmt::Display for UpsertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpsertStatus::Created => write!(f, "created"),
            UpsertStatus::Updated => write!(f, "updated"),
            UpsertStatus::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Exact-match retrieval request over fact items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactQuery {
    /// Conjunctive equality filters against top-level fact properties.
    pub filters: Record,
    /// Only return facts in this domain.
    pub domain: Option<String>,
    /// Maximum number of items returned.
    pub limit: usize,
}

impl FactQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Whether `item` satisfies the domain and property filters.
    pub fn matches(&self, item: &FactItem) -> bool {
        if let Some(domain) = &self.domain {
            if &item.domain != domain {
                return false;
            }
        }
        self.filters
            .iter()
            .all(|(key, expected)| item.properties.get(key) == Some(expected))
    }
}

/// A fact joined to its parent document, ready for LLM context assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextItem {
    pub content_text: String,
    pub item_type: String,
    pub properties: Record,
    pub location_pointer: Option<String>,
    pub document_title: String,
    pub document_url: String,
}

impl ContextItem {
    pub fn from_parts(fact: &FactItem, doc: &Document) -> Self {
        Self {
            content_text: fact.content_text.clone(),
            item_type: fact.item_type.clone(),
            properties: fact.properties.clone(),
            location_pointer: fact.location_pointer.clone(),
            document_title: doc.title.clone(),
            document_url: doc.url.clone(),
        }
    }
}
