//! Index definitions: how one model type's records become searchable
//! documents.
//!
//! A definition is plain data built once at startup: an ordered list of
//! field descriptors plus a record source. It is instantiated once per
//! unified index and reused across all indexing operations for that
//! connection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::document::{compare_pks, Document, FieldSpec, ModelKey, Record};
use crate::error::{Result, StackError};
use crate::sources::RecordSource;

/// Restricts a definition's record set on a specific connection alias.
/// Records whose `field` value does not contain `contains` are left out of
/// that alias's index entirely.
#[derive(Debug, Clone)]
pub struct AliasFilter {
    pub field: String,
    pub contains: String,
}

pub struct IndexDefinition {
    name: String,
    model: ModelKey,
    fields: Vec<FieldSpec>,
    source: Arc<dyn RecordSource>,
    alias_filters: HashMap<String, AliasFilter>,
}

impl std::fmt::Debug for IndexDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexDefinition")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("fields", &self.fields)
            .field("alias_filters", &self.alias_filters)
            .finish_non_exhaustive()
    }
}

impl IndexDefinition {
    pub fn new(
        name: impl Into<String>,
        model: ModelKey,
        fields: Vec<FieldSpec>,
        source: Arc<dyn RecordSource>,
    ) -> Result<Self> {
        let name = name.into();
        let document_fields = fields.iter().filter(|field| field.document).count();
        if document_fields != 1 {
            return Err(StackError::Config(format!(
                "index '{name}' must declare exactly one document field, found {document_fields}"
            )));
        }
        Ok(Self {
            name,
            model,
            fields,
            source,
            alias_filters: HashMap::new(),
        })
    }

    pub fn with_alias_filter(mut self, alias: impl Into<String>, filter: AliasFilter) -> Self {
        self.alias_filters.insert(alias.into(), filter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &ModelKey {
        &self.model
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn document_field(&self) -> &FieldSpec {
        // Validated at construction: exactly one document field exists.
        self.fields
            .iter()
            .find(|field| field.document)
            .expect("index definition has a document field")
    }

    /// The base record set for one connection alias, in natural (ascending
    /// pk) order. Per-alias filters apply here so a filtered connection
    /// never sees the excluded rows at all.
    pub fn index_records(&self, using: Option<&str>) -> Result<Vec<Record>> {
        let mut records = self.source.records()?;
        if let Some(filter) = using.and_then(|alias| self.alias_filters.get(alias)) {
            records.retain(|record| {
                record
                    .fields
                    .get(&filter.field)
                    .and_then(|value| value.as_str())
                    .is_some_and(|value| value.contains(&filter.contains))
            });
        }
        records.sort_by(|a, b| compare_pks(&a.pk, &b.pk));
        Ok(records)
    }

    /// Time-bounded strict subset of [`Self::index_records`]. Filtering
    /// preserves the natural ordering so batch offsets stay meaningful.
    pub fn build_records(
        &self,
        using: Option<&str>,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>> {
        let mut records = self.index_records(using)?;
        if start_date.is_some() || end_date.is_some() {
            records.retain(|record| match record.pub_date {
                Some(date) => {
                    start_date.is_none_or(|start| date >= start)
                        && end_date.is_none_or(|end| date <= end)
                }
                None => false,
            });
        }
        Ok(records)
    }

    /// Derive the backend-agnostic document for one record.
    pub fn prepare(&self, record: &Record) -> Document {
        let pk = record.canonical_pk();
        let mut content = String::new();
        let mut stored = std::collections::BTreeMap::new();

        for field in &self.fields {
            let value = record
                .fields
                .get(field.source_attr())
                .map(render_value)
                .unwrap_or_default();
            if field.document {
                content = value;
            } else if field.stored {
                stored.insert(field.name.clone(), value);
            }
        }

        Document {
            doc_id: Document::doc_id_for(&self.model, &pk),
            model: self.model.clone(),
            pk,
            content,
            stored,
        }
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
