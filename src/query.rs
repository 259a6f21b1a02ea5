//! Backend-agnostic query facade.
//!
//! A `SearchQuerySet` is bound to one connection alias and accumulates
//! filter state lazily; no I/O happens until `count`, `fetch`, or the
//! reconciliation helpers execute it. `using` rebinds the same filter state
//! to a different connection.

use std::sync::Arc;

use crate::backends::{SearchBackend, SearchRequest, SearchResults};
use crate::connections::{ConnectionRegistry, DEFAULT_ALIAS};
use crate::document::ModelKey;
use crate::error::Result;

#[derive(Clone)]
pub struct SearchQuerySet {
    registry: Arc<ConnectionRegistry>,
    alias: String,
    models: Vec<ModelKey>,
    query: Option<String>,
    order: Option<String>,
}

impl SearchQuerySet {
    pub fn new(registry: Arc<ConnectionRegistry>, alias: Option<&str>) -> Self {
        Self {
            registry,
            alias: alias.unwrap_or(DEFAULT_ALIAS).to_string(),
            models: Vec::new(),
            query: None,
            order: None,
        }
    }

    /// Rebind to another connection, preserving accumulated filter state.
    pub fn using(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }

    pub fn models(mut self, models: impl IntoIterator<Item = ModelKey>) -> Self {
        self.models.extend(models);
        self
    }

    pub fn query(mut self, text: impl Into<String>) -> Self {
        self.query = Some(text.into());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order = Some(field.into());
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    fn backend(&self) -> Result<Arc<dyn SearchBackend>> {
        self.registry.resolve(&self.alias)?.get_backend()
    }

    fn request(&self, start: usize, limit: Option<usize>) -> SearchRequest {
        SearchRequest {
            query: self.query.clone(),
            models: self.models.clone(),
            order_by: self.order.clone(),
            start,
            limit,
        }
    }

    /// Total hit count; executes the query.
    pub fn count(&self) -> Result<usize> {
        Ok(self.backend()?.search(&self.request(0, Some(0)))?.hits)
    }

    /// Execute and return one page of results.
    pub fn fetch(&self, start: usize, limit: Option<usize>) -> Result<SearchResults> {
        self.backend()?.search(&self.request(start, limit))
    }

    /// One page of `(pk, doc_id)` pairs for the stale-record scan. Only the
    /// key fields are needed, never whole documents.
    pub fn pk_and_doc_id(&self, start: usize, end: usize) -> Result<Vec<(String, String)>> {
        let results = self.fetch(start, Some(end.saturating_sub(start)))?;
        Ok(results
            .results
            .into_iter()
            .map(|hit| (hit.pk, hit.doc_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::two_connection_registry;

    #[test]
    fn lazy_until_executed() {
        let fixture = two_connection_registry();
        // Building and refining never touches a backend; a query against an
        // unknown alias only fails on execution.
        let sqs = SearchQuerySet::new(Arc::clone(&fixture.registry), None)
            .using("ghost")
            .query("foo");
        assert!(sqs.count().is_err());
    }

    #[test]
    fn using_preserves_filter_state() {
        let fixture = two_connection_registry();
        fixture.index_all("default");
        fixture.index_all("other");
        fixture.foo_source.delete(&serde_json::json!(2));
        fixture.index_all("other");

        let sqs = SearchQuerySet::new(Arc::clone(&fixture.registry), None)
            .models([crate::document::ModelKey::new("multipleindex.foo")])
            .query("foo");

        assert_eq!(sqs.clone().count().unwrap(), 2);
        assert_eq!(sqs.using("other").count().unwrap(), 1);
    }

    #[test]
    fn model_filter_counts_independently() {
        let fixture = two_connection_registry();
        fixture.index_all("default");

        let sqs = SearchQuerySet::new(Arc::clone(&fixture.registry), None);
        assert_eq!(sqs.clone().count().unwrap(), 5);
        assert_eq!(
            sqs.clone()
                .models([crate::document::ModelKey::new("multipleindex.foo")])
                .count()
                .unwrap(),
            2
        );
        assert_eq!(
            sqs.models([crate::document::ModelKey::new("multipleindex.bar")])
                .count()
                .unwrap(),
            3
        );
    }

    #[test]
    fn pk_and_doc_id_pages_cover_the_index() {
        let fixture = two_connection_registry();
        fixture.index_all("default");

        let sqs = SearchQuerySet::new(Arc::clone(&fixture.registry), None)
            .models([crate::document::ModelKey::new("multipleindex.bar")]);
        let total = sqs.count().unwrap();
        assert_eq!(total, 3);

        let mut pairs = Vec::new();
        let mut start = 0;
        while start < total {
            let page = sqs.pk_and_doc_id(start, start + 2).unwrap();
            pairs.extend(page);
            start += 2;
        }
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|(_, doc_id)| doc_id.starts_with("multipleindex.bar.")));
    }
}
