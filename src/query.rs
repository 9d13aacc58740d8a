//! Exact-match fact retrieval for LLM context assembly.
//!
//! Application entry point for `fstore query`: builds a [`FactQuery`] from
//! `key=value` filters, runs it through the core
//! [`RetrievalService`](factstore_core::retrieval::RetrievalService) with
//! the configured limit cap, and prints the items as JSON.

use anyhow::Result;
use serde_json::Value;

use factstore_core::models::{ContextItem, FactQuery};

use crate::config::Config;
use crate::db;

/// Interpret a filter value: valid JSON is taken as-is (`1`, `true`,
/// `"x"`, `null`), anything else as a plain string.
pub fn parse_filter_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn build_query(
    filters: &[(String, String)],
    domain: Option<&str>,
    limit: usize,
) -> FactQuery {
    let mut query = FactQuery::new(limit);
    for (key, raw) in filters {
        query = query.filter(key.clone(), parse_filter_value(raw));
    }
    if let Some(domain) = domain {
        query = query.domain(domain);
    }
    query
}

/// Run a query against the configured database.
pub async fn query_facts(
    config: &Config,
    filters: &[(String, String)],
    domain: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<ContextItem>> {
    let query = build_query(
        filters,
        domain,
        limit.unwrap_or(config.retrieval.default_limit),
    );

    let pool = db::connect(config).await?;
    let docs = db::document_store(config, pool.clone())?;
    let items = docs
        .retrieval()
        .with_max_limit(config.retrieval.max_limit)
        .query(&query)
        .await;
    pool.close().await;

    Ok(items?)
}

pub async fn run_query(
    config: &Config,
    filters: &[(String, String)],
    domain: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let items = query_facts(config, filters, domain, limit).await?;
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_filter_value() {
        assert_eq!(parse_filter_value("mandatory"), json!("mandatory"));
        assert_eq!(parse_filter_value("\"4\""), json!("4"));
        assert_eq!(parse_filter_value("4"), json!(4));
        assert_eq!(parse_filter_value("true"), json!(true));
        assert_eq!(parse_filter_value("null"), Value::Null);
        assert_eq!(parse_filter_value("not json {"), json!("not json {"));
    }

    #[test]
    fn test_build_query() {
        let filters = vec![
            ("requirement_type".to_string(), "mandatory".to_string()),
            ("priority".to_string(), "1".to_string()),
        ];
        let query = build_query(&filters, Some("IT"), 7);
        assert_eq!(query.limit, 7);
        assert_eq!(query.domain.as_deref(), Some("IT"));
        assert_eq!(query.filters["requirement_type"], json!("mandatory"));
        assert_eq!(query.filters["priority"], json!(1));
    }
}
