//! Configuration loading and validation.
//!
//! One TOML file declares the connection map, router rules, and index
//! definitions. The file comes from an explicit `--config` path, the
//! `SEARCHSTACK_CONFIG` env var, or `<root>/searchstack.toml`; env
//! overrides apply after the file is read. The default alias must exist —
//! its absence is a fatal startup error, never a runtime one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backends::{ENGINE_MEMORY, ENGINE_TANTIVY};
use crate::connections::DEFAULT_ALIAS;
use crate::document::FieldSpec;
use crate::error::{Result, StackError};

pub const CONFIG_FILE_NAME: &str = "searchstack.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionConfig>,
    #[serde(default)]
    pub routers: Vec<RouterRuleConfig>,
    #[serde(default)]
    pub indexes: Vec<IndexConfig>,
    /// Default worker count for update runs; 0 means in-process.
    #[serde(default)]
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_engine")]
    pub engine: String,
    /// On-disk index location; required by the tantivy engine.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Remote endpoint; reserved for network engines.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub include_spelling: bool,
    /// Index names dropped silently from this connection's unified index.
    #[serde(default)]
    pub excluded_indexes: Vec<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            path: None,
            url: None,
            timeout_secs: default_timeout_secs(),
            batch_size: default_batch_size(),
            include_spelling: false,
            excluded_indexes: Vec::new(),
        }
    }
}

fn default_engine() -> String {
    ENGINE_MEMORY.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_batch_size() -> usize {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterRuleConfig {
    pub model_prefix: String,
    pub alias: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub name: String,
    pub model: String,
    /// JSON record fixture backing this index.
    pub source: PathBuf,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub alias_filters: Vec<AliasFilterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasFilterConfig {
    pub alias: String,
    pub field: String,
    pub contains: String,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("SEARCHSTACK_CONFIG").ok().map(PathBuf::from));

        let path = match explicit {
            Some(path) => path,
            None => root.join(CONFIG_FILE_NAME),
        };

        let raw = std::fs::read_to_string(&path)
            .map_err(|err| StackError::Config(format!("read config {}: {err}", path.display())))?;
        let mut config: Self = toml::from_str(&raw)
            .map_err(|err| StackError::Config(format!("parse config {}: {err}", path.display())))?;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(batch_size) = env_usize("SEARCHSTACK_BATCH_SIZE")? {
            for connection in self.connections.values_mut() {
                connection.batch_size = batch_size;
            }
        }
        if let Some(workers) = env_usize("SEARCHSTACK_WORKERS")? {
            self.workers = workers;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.connections.contains_key(DEFAULT_ALIAS) {
            return Err(StackError::Config(format!(
                "the default alias '{DEFAULT_ALIAS}' must be present in [connections]"
            )));
        }

        for (alias, connection) in &self.connections {
            match connection.engine.as_str() {
                ENGINE_MEMORY => {}
                ENGINE_TANTIVY => {
                    if connection.path.is_none() {
                        return Err(StackError::Config(format!(
                            "connection '{alias}': engine 'tantivy' requires a 'path'"
                        )));
                    }
                }
                other => {
                    return Err(StackError::Config(format!(
                        "connection '{alias}': unknown engine '{other}'"
                    )));
                }
            }
            if connection.batch_size == 0 {
                return Err(StackError::Config(format!(
                    "connection '{alias}': batch_size must be positive"
                )));
            }
        }

        for rule in &self.routers {
            if !self.connections.contains_key(&rule.alias) {
                return Err(StackError::Config(format!(
                    "router for prefix '{}' targets unknown alias '{}'",
                    rule.model_prefix, rule.alias
                )));
            }
        }

        let mut names = std::collections::HashSet::new();
        let mut models = std::collections::HashSet::new();
        for index in &self.indexes {
            if !names.insert(&index.name) {
                return Err(StackError::Config(format!(
                    "duplicate index name '{}'",
                    index.name
                )));
            }
            if !models.insert(&index.model) {
                return Err(StackError::Config(format!(
                    "duplicate index for model '{}'",
                    index.model
                )));
            }
            let document_fields = index.fields.iter().filter(|field| field.document).count();
            if document_fields != 1 {
                return Err(StackError::Config(format!(
                    "index '{}' must declare exactly one document field, found {document_fields}",
                    index.name
                )));
            }
        }

        Ok(())
    }
}

fn env_usize(key: &str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<usize>()
            .map(Some)
            .map_err(|err| StackError::Config(format!("invalid {key} value {value}: {err}"))),
        Err(_) => Ok(None),
    }
}
