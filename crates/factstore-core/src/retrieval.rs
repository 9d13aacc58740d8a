//! Read-only fact retrieval for LLM context assembly.
//!
//! Facts are joined to their parent document, filtered by exact equality on
//! top-level properties (all filters must match) and an optional domain,
//! and truncated to the requested limit in insertion order.
//!
//! The embedding slot is never consulted: results are **not** ordered by
//! vector relevance. Callers that need similarity ranking must substitute a
//! similarity-capable backend.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::models::{ContextItem, FactQuery};
use crate::store::Store;

pub struct RetrievalService<S: Store> {
    store: Arc<S>,
    max_limit: Option<usize>,
}

impl<S: Store> RetrievalService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_limit: None,
        }
    }

    /// Cap every query's limit at `max_limit`.
    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = Some(max_limit);
        self
    }

    pub async fn query(&self, query: &FactQuery) -> Result<Vec<ContextItem>> {
        let limit = match self.max_limit {
            Some(max) => query.limit.min(max),
            None => query.limit,
        };
        if limit == 0 {
            return Ok(Vec::new());
        }

        let capped;
        let effective = if limit == query.limit {
            query
        } else {
            capped = FactQuery {
                limit,
                ..query.clone()
            };
            &capped
        };

        let items = self.store.query_facts(effective).await?;
        debug!(
            filters = effective.filters.len(),
            domain = effective.domain.as_deref().unwrap_or("*"),
            limit,
            returned = items.len(),
            "fact query"
        );
        Ok(items)
    }
}
