//! Configuration document (YAML or JSON).
//!
//! Shape:
//! start: "2020-01-01"            # optional, used by the exporter
//! end: "2020-08-01"              # optional, used by the exporter
//! limit: 100000                  # optional
//! sources:                       # exported audit log locations
//!   - { project: gcp-project-1, dataset: audit_log }
//! filters:
//!   excluded_tables:
//!     - { project_regexp: ..., dataset_regexp: ..., table_regexp: ... }
//!   excluded_principal_emails: [ ... ]
//!
//! Only `filters` drives graph construction; the rest is carried for the
//! export side.

pub mod filter;

pub use filter::{FilterPolicy, FiltersSpec};

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_LIMIT: u64 = 100_000;

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSpec {
    #[serde(default)]
    pub start: Option<String>,

    #[serde(default)]
    pub end: Option<String>,

    #[serde(default = "default_limit")]
    pub limit: u64,

    #[serde(default)]
    pub sources: Vec<Source>,

    #[serde(default)]
    pub filters: FiltersSpec,
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

/// A project/dataset pair holding exported audit logs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Source {
    pub project: String,
    pub dataset: String,
}

/// Validated configuration with compiled filters.
#[derive(Debug, Clone)]
pub struct Config {
    pub start: Option<String>,
    pub end: Option<String>,
    pub limit: u64,
    pub sources: Vec<Source>,
    pub filters: FilterPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            limit: DEFAULT_LIMIT,
            sources: Vec::new(),
            filters: FilterPolicy::default(),
        }
    }
}

impl ConfigSpec {
    pub fn validate_and_build(self) -> anyhow::Result<Config> {
        let filters = self
            .filters
            .validate_and_build()
            .context("invalid filters section")?;

        Ok(Config {
            start: self.start,
            end: self.end,
            limit: self.limit,
            sources: self.sources,
            filters,
        })
    }
}

/// Load and validate a config file. `.json` files are read as JSON,
/// anything else as YAML.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let spec: ConfigSpec = if is_json {
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?
    } else {
        serde_yaml::from_str(&text).with_context(|| format!("parse {}", path.display()))?
    };

    spec.validate_and_build()
        .with_context(|| format!("validate {}", path.display()))
}
