//! The extraction envelope: the JSON shape `fstore ingest` reads.
//!
//! An envelope wraps one LLM-extracted record with its source identity and
//! the raw content its change signal is computed from:
//!
//! ```json
//! {
//!   "source_type": "policy",
//!   "source_url": "https://example.com/policies/security",
//!   "content": "raw page text ...",
//!   "record": { "policy_title": "Security Policy", "requirements": [ ... ] }
//! }
//! ```
//!
//! `id`, `title`, `domain`, and `metadata` are optional.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use factstore_core::hash;
use factstore_core::models::{Record, UpsertRequest};
use factstore_core::shred::{derive_domain, derive_title};

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Explicit document id. Defaults to a fingerprint of url and type.
    #[serde(default)]
    pub id: Option<String>,
    pub source_type: String,
    pub source_url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    pub content: String,
    pub record: Record,
    #[serde(default)]
    pub metadata: Record,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EnvelopeFile {
    Many(Vec<Envelope>),
    One(Box<Envelope>),
}

impl Envelope {
    /// Resolve defaults and turn the envelope into an upsert request.
    pub fn into_request(self, domain_fields: &[String]) -> Result<UpsertRequest> {
        if self.source_type.trim().is_empty() {
            bail!("envelope for {} has an empty source_type", self.source_url);
        }
        let doc_id = self
            .id
            .unwrap_or_else(|| hash::document_id(&self.source_url, &self.source_type));
        let title = self
            .title
            .unwrap_or_else(|| derive_title(&self.record));
        let domain = self
            .domain
            .unwrap_or_else(|| derive_domain(&self.record, domain_fields, &self.source_type));

        Ok(UpsertRequest {
            doc_id,
            source_type: self.source_type,
            title,
            url: self.source_url,
            metadata: self.metadata,
            domain,
            content: self.content,
            record: self.record,
        })
    }
}

/// Parse a JSON document holding one envelope or an array of them.
pub fn parse_envelopes(json: &str) -> Result<Vec<Envelope>> {
    let file: EnvelopeFile =
        serde_json::from_str(json).with_context(|| "Failed to parse extraction envelope")?;
    Ok(match file {
        EnvelopeFile::Many(envelopes) => envelopes,
        EnvelopeFile::One(envelope) => vec![*envelope],
    })
}

pub fn read_envelopes(path: &Path) -> Result<Vec<Envelope>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read envelope file: {}", path.display()))?;
    parse_envelopes(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<String> {
        vec!["policy_type".to_string()]
    }

    #[test]
    fn test_parse_single_and_array() {
        let one = r#"{"source_type":"policy","source_url":"u","content":"c","record":{}}"#;
        assert_eq!(parse_envelopes(one).unwrap().len(), 1);

        let many = format!("[{0},{0}]", one);
        assert_eq!(parse_envelopes(&many).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let err = parse_envelopes(r#"{"source_type":"policy","content":"c","record":{}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_defaults_are_derived() {
        let envelope = parse_envelopes(
            r#"{
                "source_type": "policy",
                "source_url": "http://example.com/p",
                "content": "body",
                "record": {"policy_title": "Security", "policy_type": "IT"}
            }"#,
        )
        .unwrap()
        .remove(0);
        let req = envelope.into_request(&fields()).unwrap();
        assert_eq!(req.doc_id, hash::document_id("http://example.com/p", "policy"));
        assert_eq!(req.title, "Security");
        assert_eq!(req.domain, "IT");
        assert_eq!(req.url, "http://example.com/p");
    }

    #[test]
    fn test_explicit_values_win() {
        let envelope = parse_envelopes(
            r#"{
                "id": "doc1",
                "source_type": "article",
                "source_url": "u",
                "title": "Given",
                "domain": "news",
                "content": "body",
                "record": {"title": "Ignored"},
                "metadata": {"model": "m1"}
            }"#,
        )
        .unwrap()
        .remove(0);
        let req = envelope.into_request(&fields()).unwrap();
        assert_eq!(req.doc_id, "doc1");
        assert_eq!(req.title, "Given");
        assert_eq!(req.domain, "news");
        assert_eq!(req.metadata["model"], "m1");
    }

    #[test]
    fn test_domain_falls_back_to_source_type() {
        let envelope = parse_envelopes(
            r#"{"source_type":"meeting","source_url":"u","content":"c","record":{}}"#,
        )
        .unwrap()
        .remove(0);
        let req = envelope.into_request(&fields()).unwrap();
        assert_eq!(req.domain, "meeting");
        assert_eq!(req.title, "Untitled");
    }

    #[test]
    fn test_rejects_blank_source_type() {
        let envelope = parse_envelopes(
            r#"{"source_type":" ","source_url":"u","content":"c","record":{}}"#,
        )
        .unwrap()
        .remove(0);
        assert!(envelope.into_request(&fields()).is_err());
    }
}
