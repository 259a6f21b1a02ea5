//! Per-connection aggregate of index definitions.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::document::ModelKey;
use crate::error::{Result, StackError};
use crate::indexes::IndexDefinition;

/// Maps model keys to index definitions for one connection. Definitions
/// named in the connection's exclusion list are dropped silently at build
/// time and never appear in the mapping.
#[derive(Debug, Default)]
pub struct UnifiedIndex {
    indexes: BTreeMap<ModelKey, Arc<IndexDefinition>>,
    collected: Vec<Arc<IndexDefinition>>,
}

impl UnifiedIndex {
    pub fn build(definitions: Vec<Arc<IndexDefinition>>, excluded: &[String]) -> Result<Self> {
        let mut indexes = BTreeMap::new();
        let mut collected = Vec::new();

        for definition in definitions {
            if excluded.iter().any(|name| name == definition.name()) {
                continue;
            }
            if indexes
                .insert(definition.model().clone(), Arc::clone(&definition))
                .is_some()
            {
                return Err(StackError::Config(format!(
                    "duplicate index for model '{}'",
                    definition.model()
                )));
            }
            collected.push(definition);
        }

        Ok(Self { indexes, collected })
    }

    pub fn get_index(&self, model: &ModelKey) -> Result<&Arc<IndexDefinition>> {
        self.indexes
            .get(model)
            .ok_or_else(|| StackError::NotHandled(model.to_string()))
    }

    pub fn get_indexed_models(&self) -> Vec<ModelKey> {
        self.indexes.keys().cloned().collect()
    }

    pub fn collect_indexes(&self) -> &[Arc<IndexDefinition>] {
        &self.collected
    }

    /// Models whose key or app label matches `label`.
    pub fn models_for_label(&self, label: &str) -> Vec<ModelKey> {
        self.indexes
            .keys()
            .filter(|model| model.matches_label(label))
            .cloned()
            .collect()
    }
}
