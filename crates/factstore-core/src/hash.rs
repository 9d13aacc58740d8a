//! Deterministic SHA-256 fingerprints.
//!
//! Every identifier and change signal in factstore is content-addressed:
//! document ids are derived from source identity, fact ids from the owning
//! document plus a seed, and change detection compares fingerprints of the
//! raw content.
//!
//! Components are length-prefixed before hashing, so the boundaries between
//! them are part of the digest:
//!
//! ```rust
//! use factstore_core::hash::fingerprint;
//!
//! assert_eq!(fingerprint(["foo", "bar"]), fingerprint(["foo", "bar"]));
//! assert_ne!(fingerprint(["ab", "c"]), fingerprint(["a", "bc"]));
//! assert_eq!(fingerprint(["foo"]).len(), 64);
//! ```

use sha2::{Digest, Sha256};

/// Hash an ordered sequence of components into a 64-char lower-case hex
/// SHA-256 digest.
pub fn fingerprint<I>(components: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut hasher = Sha256::new();
    for component in components {
        let bytes = component.as_ref();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    format!("{:x}", hasher.finalize())
}

/// Stable document id for an entity extracted from `source_url`.
pub fn document_id(source_url: &str, source_type: &str) -> String {
    fingerprint([source_url, source_type])
}

/// Fingerprint of raw document content, used for change detection.
pub fn content_hash(content: &str) -> String {
    fingerprint([content])
}

/// Id of a fact item: the owning document plus a natural or positional seed.
pub fn fact_id(doc_id: &str, seed: &str) -> String {
    fingerprint([doc_id, seed])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = fingerprint(["project", "path/to/file.py"]);
        let b = fingerprint(["project", "path/to/file.py"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_order_sensitive() {
        assert_ne!(fingerprint(["a", "b"]), fingerprint(["b", "a"]));
    }

    #[test]
    fn test_fingerprint_component_boundaries() {
        assert_ne!(fingerprint(["ab", "c"]), fingerprint(["a", "bc"]));
        assert_ne!(fingerprint(["abc"]), fingerprint(["ab", "c"]));
        assert_ne!(fingerprint([""]), fingerprint(["", ""]));
    }

    #[test]
    fn test_document_id_depends_on_type() {
        let url = "https://example.com/policy";
        assert_ne!(document_id(url, "policy"), document_id(url, "article"));
        assert_eq!(document_id(url, "policy"), document_id(url, "policy"));
    }

    #[test]
    fn test_content_hash_changes_with_content() {
        assert_ne!(content_hash("v1"), content_hash("v2"));
        assert_eq!(content_hash("v1"), fingerprint(["v1"]));
    }

    #[test]
    fn test_fact_id_scoped_to_document() {
        assert_ne!(fact_id("doc-a", "REQ-01"), fact_id("doc-b", "REQ-01"));
    }
}
