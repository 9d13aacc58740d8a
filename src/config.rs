//! Configuration parsing and validation.
//!
//! factstore is configured by a TOML file (default `./config/fstore.toml`).
//! Only `[db]` is required; every other section falls back to defaults.
//!
//! ```toml
//! [db]
//! path = "./data/fstore.sqlite"
//!
//! [embedding]
//! provider = "placeholder"
//! dims = 768
//!
//! [retrieval]
//! default_limit = 5
//! max_limit = 1000
//!
//! [shredding]
//! include_default_rules = true
//! excluded_metadata_keys = ["content", "paragraphs"]
//! domain_fields = ["policy_type"]
//!
//! [[shredding.rules]]
//! list_key = "findings"
//! item_type = "finding"
//! content_field = "summary"
//! id_field = "finding_id"
//! domain = "audit"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use factstore_core::documents::DEFAULT_EXCLUDED_METADATA_KEYS;
use factstore_core::embedding::{Embedder, PlaceholderEmbedder, DEFAULT_EMBEDDING_DIMS};
use factstore_core::shred::{RuleBook, ShreddingRule};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub shredding: ShreddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
}

fn default_provider() -> String {
    "placeholder".to_string()
}

fn default_dims() -> usize {
    DEFAULT_EMBEDDING_DIMS
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            dims: default_dims(),
        }
    }
}

impl EmbeddingConfig {
    /// Build the configured embedder.
    pub fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        match self.provider.as_str() {
            "placeholder" => Ok(Arc::new(PlaceholderEmbedder::new(self.dims))),
            other => bail!("Unknown embedding provider: '{}'", other),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_limit() -> usize {
    5
}

fn default_max_limit() -> usize {
    1000
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShreddingConfig {
    #[serde(default = "default_true")]
    pub include_default_rules: bool,
    #[serde(default = "default_excluded_keys")]
    pub excluded_metadata_keys: Vec<String>,
    #[serde(default = "default_domain_fields")]
    pub domain_fields: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

fn default_true() -> bool {
    true
}

fn default_excluded_keys() -> Vec<String> {
    DEFAULT_EXCLUDED_METADATA_KEYS
        .iter()
        .map(|k| k.to_string())
        .collect()
}

fn default_domain_fields() -> Vec<String> {
    vec!["policy_type".to_string()]
}

impl Default for ShreddingConfig {
    fn default() -> Self {
        Self {
            include_default_rules: true,
            excluded_metadata_keys: default_excluded_keys(),
            domain_fields: default_domain_fields(),
            rules: Vec::new(),
        }
    }
}

/// A `[[shredding.rules]]` entry.
#[derive(Debug, Deserialize, Clone)]
pub struct RuleConfig {
    pub list_key: String,
    pub item_type: String,
    pub content_field: String,
    #[serde(default)]
    pub id_field: Option<String>,
    #[serde(default)]
    pub location_field: Option<String>,
    /// Restrict the rule to one domain. Absent means every domain.
    #[serde(default)]
    pub domain: Option<String>,
}

impl RuleConfig {
    fn to_rule(&self) -> ShreddingRule {
        ShreddingRule {
            list_key: self.list_key.clone(),
            item_type: self.item_type.clone(),
            content_field: self.content_field.clone(),
            id_field: self.id_field.clone(),
            location_field: self.location_field.clone(),
        }
    }
}

impl ShreddingConfig {
    /// Assemble the rule book: built-in rules first (if enabled), then the
    /// configured rules, which replace built-ins with the same `list_key`.
    pub fn rule_book(&self) -> RuleBook {
        let mut book = if self.include_default_rules {
            RuleBook::with_defaults()
        } else {
            RuleBook::new()
        };
        for rule in &self.rules {
            match &rule.domain {
                Some(domain) => book.register_for_domain(domain.clone(), rule.to_rule()),
                None => book.register(rule.to_rule()),
            }
        }
        book
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate embedding
    if config.embedding.dims == 0 {
        bail!("embedding.dims must be > 0");
    }
    match config.embedding.provider.as_str() {
        "placeholder" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be placeholder.",
            other
        ),
    }

    // Validate retrieval
    if config.retrieval.default_limit < 1 {
        bail!("retrieval.default_limit must be >= 1");
    }
    if config.retrieval.default_limit > config.retrieval.max_limit {
        bail!(
            "retrieval.default_limit ({}) must be <= retrieval.max_limit ({})",
            config.retrieval.default_limit,
            config.retrieval.max_limit
        );
    }

    // Validate shredding rules
    let mut seen = HashSet::new();
    for (i, rule) in config.shredding.rules.iter().enumerate() {
        for (field, value) in [
            ("list_key", &rule.list_key),
            ("item_type", &rule.item_type),
            ("content_field", &rule.content_field),
        ] {
            if value.trim().is_empty() {
                bail!("shredding.rules[{}].{} must not be empty", i, field);
            }
        }
        if !seen.insert((rule.domain.clone(), rule.list_key.clone())) {
            bail!(
                "shredding.rules[{}]: duplicate rule for list_key '{}' in {}",
                i,
                rule.list_key,
                rule.domain
                    .as_deref()
                    .map(|d| format!("domain '{}'", d))
                    .unwrap_or_else(|| "all domains".to_string())
            );
        }
    }

    Ok(())
}
