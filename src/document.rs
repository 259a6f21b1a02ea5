//! Records, documents, and field descriptors.
//!
//! A `Record` is a row from the authoritative store; a `Document` is its
//! prepared, backend-agnostic representation. Field descriptors are plain
//! data built once at startup.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies an indexed model type, e.g. `"blog.article"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelKey(pub String);

impl ModelKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The app portion of the key (`"blog"` for `"blog.article"`).
    pub fn app_label(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// True when `label` names either this model or its whole app.
    pub fn matches_label(&self, label: &str) -> bool {
        self.0 == label || self.app_label() == label
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row from the authoritative record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Primary key. May be numeric or a string (UUIDs etc.); always compared
    /// through [`Record::canonical_pk`].
    pub pk: serde_json::Value,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
    /// Publication timestamp used by date-bounded reindexing.
    #[serde(default)]
    pub pub_date: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(pk: impl Into<serde_json::Value>) -> Self {
        Self {
            pk: pk.into(),
            fields: serde_json::Map::new(),
            pub_date: None,
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_pub_date(mut self, pub_date: DateTime<Utc>) -> Self {
        self.pub_date = Some(pub_date);
        self
    }

    /// Canonical byte form of the primary key so numeric and non-numeric
    /// key types compare uniformly.
    pub fn canonical_pk(&self) -> String {
        canonical_pk(&self.pk)
    }
}

pub fn canonical_pk(pk: &serde_json::Value) -> String {
    match pk {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Natural record ordering: numeric pks sort numerically, everything else
/// lexically, numbers before strings. Batch offsets rely on this being the
/// same for filtered and unfiltered record sets.
pub fn compare_pks(a: &serde_json::Value, b: &serde_json::Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => canonical_pk(a).cmp(&canonical_pk(b)),
    }
}

/// What kind of value a field holds; drives backend schema mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Keyword,
    Date,
}

/// Declarative description of one searchable field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Record attribute the value is read from; defaults to `name`.
    #[serde(default)]
    pub attr: Option<String>,
    /// The single full-text document field for the model.
    #[serde(default)]
    pub document: bool,
    #[serde(default)]
    pub faceted: bool,
    #[serde(default = "default_stored")]
    pub stored: bool,
    #[serde(default)]
    pub kind: FieldKind,
}

fn default_stored() -> bool {
    true
}

impl FieldSpec {
    pub fn source_attr(&self) -> &str {
        self.attr.as_deref().unwrap_or(&self.name)
    }
}

/// A prepared, backend-agnostic search document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Index-internal record identifier, `<model>.<pk>`.
    pub doc_id: String,
    pub model: ModelKey,
    pub pk: String,
    /// The document field's text, what free-text queries match against.
    pub content: String,
    /// Remaining stored field values, keyed by field name.
    pub stored: BTreeMap<String, String>,
}

impl Document {
    pub fn doc_id_for(model: &ModelKey, pk: &str) -> String {
        format!("{}.{}", model.as_str(), pk)
    }
}
