//! Record shredding: decompose one structured record into atomic fact items.
//!
//! Shredding is driven entirely by registered [`ShreddingRule`]s. A list in
//! the record is only turned into facts when a rule for its key is registered
//! for the document's domain; every other field stays in the document's
//! metadata. This allow-list keeps unknown nested lists from exploding into
//! facts nobody asked for.
//!
//! # Algorithm
//!
//! For every record key with a rule whose value is an array, each element at
//! index `i` becomes one [`FactItem`]:
//!
//! 1. A string element is the fact's text; it has no properties, no location,
//!    and the positional seed `"{list_key}_{i}"`.
//! 2. An object element takes its text from the rule's `content_field`, with
//!    a non-empty `description` appended. All other fields become
//!    properties. The seed is the `id_field` value when present, else
//!    positional. The location is the `location_field` value, if any.
//! 3. The fact id is `fingerprint(doc_id, seed)`.
//! 4. The embedding slot is filled by the configured [`Embedder`].
//!
//! Elements that do not fit the rule are skipped and reported as
//! [`SchemaMismatch`]es; the rest of the record is still shredded.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::hash;
use crate::models::{FactItem, Record};

/// Field whose text is appended to the content of object elements.
const DESCRIPTION_FIELD: &str = "description";

/// Declarative rule for shredding one list key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShreddingRule {
    /// Record key holding the list to shred.
    pub list_key: String,
    /// Tag written onto every fact this rule produces.
    pub item_type: String,
    /// Element field holding the fact's primary text.
    pub content_field: String,
    /// Element field used as a stable id seed.
    #[serde(default)]
    pub id_field: Option<String>,
    /// Element field copied into `location_pointer`.
    #[serde(default)]
    pub location_field: Option<String>,
}

impl ShreddingRule {
    pub fn new(
        list_key: impl Into<String>,
        item_type: impl Into<String>,
        content_field: impl Into<String>,
    ) -> Self {
        Self {
            list_key: list_key.into(),
            item_type: item_type.into(),
            content_field: content_field.into(),
            id_field: None,
            location_field: None,
        }
    }

    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    pub fn with_location_field(mut self, field: impl Into<String>) -> Self {
        self.location_field = Some(field.into());
        self
    }
}

/// Registry of shredding rules, scoped per domain.
///
/// Shared rules apply to every domain. Domain rules add to them and win
/// over a shared rule with the same `list_key`.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    shared: BTreeMap<String, ShreddingRule>,
    by_domain: HashMap<String, BTreeMap<String, ShreddingRule>>,
}

impl RuleBook {
    /// An empty rule book: nothing is shredded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for the policy, article, and civic record shapes.
    pub fn with_defaults() -> Self {
        let mut book = Self::new();
        book.register(
            ShreddingRule::new("requirements", "requirement", "statement")
                .with_id_field("requirement_id")
                .with_location_field("source_section"),
        );
        book.register(
            ShreddingRule::new("sections", "section", "content")
                .with_id_field("heading")
                .with_location_field("heading"),
        );
        book.register(
            ShreddingRule::new("agenda_items", "agenda_item", "title")
                .with_id_field("number")
                .with_location_field("number"),
        );
        book.register(
            ShreddingRule::new("votes", "vote", "motion")
                .with_id_field("motion")
                .with_location_field("result"),
        );
        book.register(ShreddingRule::new(
            "public_comments",
            "public_comment",
            "text",
        ));
        book
    }

    /// Register a rule for every domain, replacing one with the same key.
    pub fn register(&mut self, rule: ShreddingRule) {
        self.shared.insert(rule.list_key.clone(), rule);
    }

    /// Register a rule that only applies to `domain`.
    pub fn register_for_domain(&mut self, domain: impl Into<String>, rule: ShreddingRule) {
        self.by_domain
            .entry(domain.into())
            .or_default()
            .insert(rule.list_key.clone(), rule);
    }

    /// The rule that shreds `list_key` for documents in `domain`.
    pub fn rule_for(&self, domain: &str, list_key: &str) -> Option<&ShreddingRule> {
        self.by_domain
            .get(domain)
            .and_then(|rules| rules.get(list_key))
            .or_else(|| self.shared.get(list_key))
    }

    pub fn is_empty(&self) -> bool {
        self.shared.is_empty() && self.by_domain.values().all(BTreeMap::is_empty)
    }
}

/// One record element that could not be shredded under its rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{list_key}[{index}]: {reason}")]
pub struct SchemaMismatch {
    pub list_key: String,
    pub index: usize,
    pub reason: String,
}

/// Result of shredding one record.
#[derive(Debug, Clone, Default)]
pub struct ShredOutcome {
    pub items: Vec<FactItem>,
    pub mismatches: Vec<SchemaMismatch>,
}

/// Turns structured records into fact items according to a [`RuleBook`].
#[derive(Clone)]
pub struct Shredder {
    rules: RuleBook,
    embedder: Arc<dyn Embedder>,
}

/// Fields extracted from one element before id assignment.
struct Draft {
    content_text: String,
    properties: Record,
    seed: Option<String>,
    location_pointer: Option<String>,
}

impl Shredder {
    pub fn new(rules: RuleBook, embedder: Arc<dyn Embedder>) -> Self {
        Self { rules, embedder }
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Record keys that [`shred`](Self::shred) consumes for `domain`.
    pub fn consumed_keys(&self, domain: &str, record: &Record) -> Vec<String> {
        record
            .iter()
            .filter(|(key, value)| value.is_array() && self.rules.rule_for(domain, key).is_some())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Shred `record` into fact items owned by `doc_id`.
    ///
    /// Fails only if the embedder breaks its fixed-shape contract; element
    /// level problems are reported in [`ShredOutcome::mismatches`].
    pub fn shred(&self, doc_id: &str, domain: &str, record: &Record) -> Result<ShredOutcome> {
        let mut outcome = ShredOutcome::default();
        let mut seen_ids: HashSet<String> = HashSet::new();

        for (list_key, value) in record {
            let Some(rule) = self.rules.rule_for(domain, list_key) else {
                continue;
            };
            let Value::Array(elements) = value else {
                continue;
            };

            for (index, element) in elements.iter().enumerate() {
                let draft = match draft_element(rule, element) {
                    Ok(draft) => draft,
                    Err(reason) => {
                        record_mismatch(&mut outcome, doc_id, list_key, index, reason);
                        continue;
                    }
                };

                let id = match draft.seed.as_deref().map(|seed| hash::fact_id(doc_id, seed)) {
                    Some(natural) if !seen_ids.contains(&natural) => natural,
                    natural => {
                        if natural.is_some() {
                            debug!(
                                doc_id,
                                list_key = list_key.as_str(),
                                index,
                                "duplicate natural id, using position"
                            );
                        }
                        positional_id(doc_id, list_key, index, &seen_ids)
                    }
                };
                seen_ids.insert(id.clone());

                let embedding = self.embedder.embed(&draft.content_text);
                if embedding.len() != self.embedder.dims() {
                    return Err(Error::InvariantViolation(format!(
                        "embedder '{}' returned {} values, expected {}",
                        self.embedder.model_name(),
                        embedding.len(),
                        self.embedder.dims()
                    )));
                }

                outcome.items.push(FactItem {
                    id,
                    doc_id: doc_id.to_string(),
                    domain: domain.to_string(),
                    item_type: rule.item_type.clone(),
                    content_text: draft.content_text,
                    embedding,
                    properties: draft.properties,
                    location_pointer: draft.location_pointer,
                });
            }
        }

        Ok(outcome)
    }
}

/// First free id among `"{list_key}_{index}"`, then `"{list_key}_{index}_{n}"`
/// for n = 1, 2, ...
fn positional_id(doc_id: &str, list_key: &str, index: usize, taken: &HashSet<String>) -> String {
    let base = format!("{}_{}", list_key, index);
    let mut id = hash::fact_id(doc_id, &base);
    let mut n = 1;
    while taken.contains(&id) {
        id = hash::fact_id(doc_id, &format!("{}_{}", base, n));
        n += 1;
    }
    id
}

fn record_mismatch(
    outcome: &mut ShredOutcome,
    doc_id: &str,
    list_key: &str,
    index: usize,
    reason: String,
) {
    let mismatch = SchemaMismatch {
        list_key: list_key.to_string(),
        index,
        reason,
    };
    warn!(doc_id, %mismatch, "skipping element that does not match its shredding rule");
    outcome.mismatches.push(mismatch);
}

fn draft_element(rule: &ShreddingRule, element: &Value) -> std::result::Result<Draft, String> {
    match element {
        Value::String(text) => Ok(Draft {
            content_text: text.clone(),
            properties: Record::new(),
            seed: None,
            location_pointer: None,
        }),
        Value::Object(fields) => draft_object(rule, fields),
        other => Err(format!(
            "expected a string or an object, found {}",
            value_kind(other)
        )),
    }
}

fn draft_object(rule: &ShreddingRule, fields: &Record) -> std::result::Result<Draft, String> {
    let mut content_text = match fields.get(&rule.content_field) {
        Some(Value::String(text)) => text.clone(),
        Some(other) => {
            return Err(format!(
                "content field '{}' is {}, expected a string",
                rule.content_field,
                value_kind(other)
            ))
        }
        None => return Err(format!("missing content field '{}'", rule.content_field)),
    };

    if rule.content_field != DESCRIPTION_FIELD {
        if let Some(Value::String(description)) = fields.get(DESCRIPTION_FIELD) {
            if !description.is_empty() {
                if !content_text.is_empty() {
                    content_text.push(' ');
                }
                content_text.push_str(description);
            }
        }
    }

    let properties: Record = fields
        .iter()
        .filter(|(key, _)| **key != rule.content_field)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let seed = rule
        .id_field
        .as_ref()
        .and_then(|field| fields.get(field))
        .and_then(scalar_text);
    let location_pointer = rule
        .location_field
        .as_ref()
        .and_then(|field| fields.get(field))
        .and_then(scalar_text);

    Ok(Draft {
        content_text,
        properties,
        seed,
        location_pointer,
    })
}

/// Text form of a scalar; `None` for null, empty strings, and containers.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Build a document's metadata: caller metadata overlaid with every record
/// field that was neither shredded nor excluded as bulk content.
pub fn build_metadata(
    caller_metadata: &Record,
    record: &Record,
    consumed_keys: &[String],
    excluded_keys: &[String],
) -> Record {
    let mut metadata = caller_metadata.clone();
    for (key, value) in record {
        if consumed_keys.contains(key) || excluded_keys.contains(key) {
            continue;
        }
        metadata.insert(key.clone(), value.clone());
    }
    metadata
}

/// Display title for a record: `title`, then `policy_title`, then `"Untitled"`.
pub fn derive_title(record: &Record) -> String {
    ["title", "policy_title"]
        .iter()
        .filter_map(|key| record.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| "Untitled".to_string())
}

/// Domain for a record: the first of `domain_fields` holding a non-empty
/// string, else `fallback` (normally the source type).
pub fn derive_domain(record: &Record, domain_fields: &[String], fallback: &str) -> String {
    domain_fields
        .iter()
        .filter_map(|key| record.get(key))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| fallback.to_string())
}
