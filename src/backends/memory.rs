//! Trivial in-memory engine.
//!
//! Holds committed documents in a map and stages uncommitted writes in an
//! ordered log, so `commit = false` defers visibility exactly like the
//! persistent engines. Doubles as the test harness backend.

use std::collections::BTreeMap;

use parking_lot::{Mutex, RwLock};

use crate::document::{Document, FieldSpec, Record};
use crate::error::Result;
use crate::indexes::IndexDefinition;

use super::{describe_schema, SchemaField, SearchBackend, SearchHit, SearchRequest, SearchResults};

enum PendingOp {
    Upsert(Document),
    Remove(String),
    Clear,
}

pub struct MemoryBackend {
    #[allow(dead_code)]
    alias: String,
    committed: RwLock<BTreeMap<String, Document>>,
    pending: Mutex<Vec<PendingOp>>,
}

impl MemoryBackend {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            committed: RwLock::new(BTreeMap::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    fn apply_pending(&self) {
        let ops: Vec<PendingOp> = std::mem::take(&mut *self.pending.lock());
        let mut committed = self.committed.write();
        for op in ops {
            match op {
                PendingOp::Upsert(doc) => {
                    committed.insert(doc.doc_id.clone(), doc);
                }
                PendingOp::Remove(doc_id) => {
                    committed.remove(&doc_id);
                }
                PendingOp::Clear => committed.clear(),
            }
        }
    }

    fn matches(doc: &Document, request: &SearchRequest) -> bool {
        if !request.models.is_empty() && !request.models.contains(&doc.model) {
            return false;
        }
        match &request.query {
            None => true,
            Some(query) => {
                let content_tokens: Vec<String> = tokenize(&doc.content);
                tokenize(query)
                    .iter()
                    .all(|token| content_tokens.contains(token))
            }
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl SearchBackend for MemoryBackend {
    fn update(&self, index: &IndexDefinition, records: &[Record], commit: bool) -> Result<()> {
        {
            let mut pending = self.pending.lock();
            for record in records {
                pending.push(PendingOp::Upsert(index.prepare(record)));
            }
        }
        if commit {
            self.apply_pending();
        }
        Ok(())
    }

    fn remove(&self, doc_id: &str, commit: bool) -> Result<()> {
        self.pending.lock().push(PendingOp::Remove(doc_id.to_string()));
        if commit {
            self.apply_pending();
        }
        Ok(())
    }

    fn clear(&self, commit: bool) -> Result<()> {
        self.pending.lock().push(PendingOp::Clear);
        if commit {
            self.apply_pending();
        }
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.apply_pending();
        Ok(())
    }

    fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let committed = self.committed.read();
        let mut matched: Vec<&Document> = committed
            .values()
            .filter(|doc| Self::matches(doc, request))
            .collect();

        match request.order_by.as_deref() {
            None | Some("id") => matched.sort_by(|a, b| a.doc_id.cmp(&b.doc_id)),
            Some("pk") => matched.sort_by(|a, b| a.pk.cmp(&b.pk)),
            Some(field) => matched.sort_by(|a, b| {
                let left = a.stored.get(field).map(String::as_str).unwrap_or("");
                let right = b.stored.get(field).map(String::as_str).unwrap_or("");
                left.cmp(right).then_with(|| a.doc_id.cmp(&b.doc_id))
            }),
        }

        let hits = matched.len();
        let limit = request.limit.unwrap_or(hits);
        let results = matched
            .into_iter()
            .skip(request.start)
            .take(limit)
            .map(|doc| SearchHit {
                doc_id: doc.doc_id.clone(),
                model: doc.model.clone(),
                pk: doc.pk.clone(),
                content: doc.content.clone(),
            })
            .collect();

        Ok(SearchResults { hits, results })
    }

    fn build_schema(&self, fields: &[FieldSpec]) -> (String, Vec<SchemaField>) {
        describe_schema(fields)
    }
}
