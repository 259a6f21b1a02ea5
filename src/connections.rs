//! Named connections and the registry that resolves them.
//!
//! A connection binds one alias to one backend engine instance plus its
//! unified index. Both are constructed lazily on first access and cached
//! for the connection's lifetime; duplicate construction under a benign
//! race is wasteful but safe, so `OnceLock` is all the guarding needed.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::backends::{build_backend, SearchBackend};
use crate::config::{Config, ConnectionConfig};
use crate::error::{Result, StackError};
use crate::indexes::{AliasFilter, IndexDefinition};
use crate::sources::JsonFileSource;
use crate::unified::UnifiedIndex;

/// The reserved alias every deployment must configure.
pub const DEFAULT_ALIAS: &str = "default";

pub struct Connection {
    alias: String,
    config: ConnectionConfig,
    definitions: Vec<Arc<IndexDefinition>>,
    backend: OnceLock<Arc<dyn SearchBackend>>,
    unified: OnceLock<UnifiedIndex>,
}

impl Connection {
    fn new(
        alias: String,
        config: ConnectionConfig,
        definitions: Vec<Arc<IndexDefinition>>,
    ) -> Self {
        Self {
            alias,
            config,
            definitions,
            backend: OnceLock::new(),
            unified: OnceLock::new(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// First call constructs the engine; later calls return the cached
    /// instance.
    pub fn get_backend(&self) -> Result<Arc<dyn SearchBackend>> {
        if let Some(backend) = self.backend.get() {
            return Ok(Arc::clone(backend));
        }
        let built = build_backend(&self.alias, &self.config)?;
        Ok(Arc::clone(self.backend.get_or_init(|| built)))
    }

    pub fn get_unified_index(&self) -> Result<&UnifiedIndex> {
        if let Some(unified) = self.unified.get() {
            return Ok(unified);
        }
        let built = UnifiedIndex::build(
            self.definitions.clone(),
            &self.config.excluded_indexes,
        )?;
        Ok(self.unified.get_or_init(|| built))
    }
}

pub struct ConnectionRegistry {
    connections: BTreeMap<String, Connection>,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections.keys())
            .finish()
    }
}

impl ConnectionRegistry {
    /// Build from pre-constructed definitions. Shared by `from_config` and
    /// tests that inject in-memory sources.
    pub fn new(
        connections: BTreeMap<String, ConnectionConfig>,
        definitions: Vec<Arc<IndexDefinition>>,
    ) -> Result<Self> {
        if !connections.contains_key(DEFAULT_ALIAS) {
            return Err(StackError::Config(format!(
                "the default alias '{DEFAULT_ALIAS}' must be present in the connection map"
            )));
        }
        let connections = connections
            .into_iter()
            .map(|(alias, config)| {
                let connection = Connection::new(alias.clone(), config, definitions.clone());
                (alias, connection)
            })
            .collect();
        Ok(Self { connections })
    }

    /// Build the registry from configuration; index sources resolve
    /// relative to `root`.
    pub fn from_config(config: &Config, root: &Path) -> Result<Self> {
        let mut definitions = Vec::with_capacity(config.indexes.len());
        for index_config in &config.indexes {
            let source_path = if index_config.source.is_absolute() {
                index_config.source.clone()
            } else {
                root.join(&index_config.source)
            };
            let source = Arc::new(JsonFileSource::new(source_path));
            let mut definition = IndexDefinition::new(
                &index_config.name,
                crate::document::ModelKey::new(&index_config.model),
                index_config.fields.clone(),
                source,
            )?;
            for filter in &index_config.alias_filters {
                definition = definition.with_alias_filter(
                    &filter.alias,
                    AliasFilter {
                        field: filter.field.clone(),
                        contains: filter.contains.clone(),
                    },
                );
            }
            definitions.push(Arc::new(definition));
        }
        Self::new(config.connections.clone(), definitions)
    }

    pub fn resolve(&self, alias: &str) -> Result<&Connection> {
        self.connections.get(alias).ok_or_else(|| {
            StackError::Config(format!("unknown connection alias '{alias}'"))
        })
    }

    pub fn aliases(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::SearchRequest;
    use crate::document::{FieldKind, FieldSpec, ModelKey, Record};
    use crate::sources::MemorySource;

    fn config_map(aliases: &[&str]) -> BTreeMap<String, ConnectionConfig> {
        aliases
            .iter()
            .map(|alias| (alias.to_string(), ConnectionConfig::default()))
            .collect()
    }

    fn foo_definition() -> Arc<IndexDefinition> {
        Arc::new(
            IndexDefinition::new(
                "FooIndex",
                ModelKey::new("multipleindex.foo"),
                vec![FieldSpec {
                    name: "text".to_string(),
                    attr: Some("body".to_string()),
                    document: true,
                    faceted: false,
                    stored: true,
                    kind: FieldKind::Text,
                }],
                MemorySource::new(vec![Record::new(1).with_field("body", "foo 1")]),
            )
            .unwrap(),
        )
    }

    #[test]
    fn missing_default_alias_rejected_at_construction() {
        let err = ConnectionRegistry::new(config_map(&["solr-like"]), vec![]).unwrap_err();
        assert!(matches!(err, StackError::Config(_)));
    }

    #[test]
    fn unknown_alias_is_config_error() {
        let registry = ConnectionRegistry::new(config_map(&["default"]), vec![]).unwrap();
        assert!(registry.resolve("ghost").is_err());
        registry.resolve("default").unwrap();
    }

    #[test]
    fn backend_construction_is_lazy_and_cached() {
        let registry =
            ConnectionRegistry::new(config_map(&["default"]), vec![foo_definition()]).unwrap();
        let connection = registry.resolve("default").unwrap();

        let first = connection.get_backend().unwrap();
        let second = connection.get_backend().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // The cached instance is live state, not a fresh engine per call.
        let unified = connection.get_unified_index().unwrap();
        let index = unified.get_index(&ModelKey::new("multipleindex.foo")).unwrap();
        first
            .update(index, &index.index_records(Some("default")).unwrap(), true)
            .unwrap();
        assert_eq!(second.search(&SearchRequest::default()).unwrap().hits, 1);
    }

    #[test]
    fn exclusion_list_applies_per_connection() {
        let mut configs = config_map(&["default", "filtered"]);
        configs.get_mut("filtered").unwrap().excluded_indexes = vec!["FooIndex".to_string()];

        let registry = ConnectionRegistry::new(configs, vec![foo_definition()]).unwrap();

        let default_unified = registry
            .resolve("default")
            .unwrap()
            .get_unified_index()
            .unwrap();
        assert_eq!(default_unified.get_indexed_models().len(), 1);

        let filtered_unified = registry
            .resolve("filtered")
            .unwrap()
            .get_unified_index()
            .unwrap();
        assert!(filtered_unified.get_indexed_models().is_empty());
    }
}
