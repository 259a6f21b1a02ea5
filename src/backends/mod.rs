//! Search backend adapters.
//!
//! Every engine implements the same narrow contract; the indexing engine
//! and query facade never see past it. Concrete engines are selected by
//! configuration through [`build_backend`].

use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::document::{FieldSpec, ModelKey};
use crate::error::{Result, StackError};
use crate::indexes::IndexDefinition;

pub mod memory;
pub mod tantivy;

pub use memory::MemoryBackend;
pub use tantivy::TantivyBackend;

pub const ENGINE_MEMORY: &str = "memory";
pub const ENGINE_TANTIVY: &str = "tantivy";

/// A backend-agnostic read request. Built by the query facade; executed
/// lazily.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Free-text query against the document field. `None` matches all.
    pub query: Option<String>,
    /// Restrict to these models; empty means all.
    pub models: Vec<ModelKey>,
    /// Stored field to order by; defaults to the internal record id, which
    /// keeps paginated scans deterministic.
    pub order_by: Option<String>,
    pub start: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub doc_id: String,
    pub model: ModelKey,
    pub pk: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    /// Total matches, independent of pagination.
    pub hits: usize,
    pub results: Vec<SearchHit>,
}

/// One field of a backend schema as reported by [`SearchBackend::build_schema`].
#[derive(Debug, Clone)]
pub struct SchemaField {
    pub name: String,
    pub indexed: bool,
    pub stored: bool,
}

/// The adapter contract every engine implements.
///
/// Commit semantics: with `commit = false` a write (update, remove or
/// clear) stays invisible to `search` until an explicit [`SearchBackend::commit`].
pub trait SearchBackend: Send + Sync {
    fn update(&self, index: &IndexDefinition, records: &[crate::document::Record], commit: bool)
        -> Result<()>;

    fn remove(&self, doc_id: &str, commit: bool) -> Result<()>;

    fn clear(&self, commit: bool) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn search(&self, request: &SearchRequest) -> Result<SearchResults>;

    /// Map field descriptors to the backend's schema. Returns the content
    /// field name plus the full field list.
    fn build_schema(&self, fields: &[FieldSpec]) -> (String, Vec<SchemaField>);
}

/// Construct the engine named by the connection configuration. Unknown
/// engine identifiers are a fatal configuration error.
pub fn build_backend(alias: &str, config: &ConnectionConfig) -> Result<Arc<dyn SearchBackend>> {
    match config.engine.as_str() {
        ENGINE_MEMORY => Ok(Arc::new(MemoryBackend::new(alias))),
        ENGINE_TANTIVY => {
            let path = config.path.as_ref().ok_or_else(|| {
                StackError::Config(format!(
                    "connection '{alias}': engine 'tantivy' requires a 'path'"
                ))
            })?;
            Ok(Arc::new(TantivyBackend::open(alias, path)?))
        }
        other => Err(StackError::Config(format!(
            "connection '{alias}': unknown engine '{other}' (expected '{ENGINE_MEMORY}' or '{ENGINE_TANTIVY}')"
        ))),
    }
}

/// Shared schema reporting: the document field becomes the content field,
/// everything else keeps its declared flags.
pub(crate) fn describe_schema(fields: &[FieldSpec]) -> (String, Vec<SchemaField>) {
    let content_field = fields
        .iter()
        .find(|field| field.document)
        .map(|field| field.name.clone())
        .unwrap_or_else(|| "text".to_string());
    let described = fields
        .iter()
        .map(|field| SchemaField {
            name: field.name.clone(),
            indexed: true,
            stored: field.stored,
        })
        .collect();
    (content_field, described)
}
