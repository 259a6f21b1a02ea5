//! Tantivy-backed persistent engine.
//!
//! Uses the classic four-field layout: internal record id, model key,
//! primary key, and the full-text content field. Per-index stored fields
//! beyond the content field live only in engines that keep whole documents;
//! the reconciliation scan and hit counts need nothing more than these four.

use std::path::Path;

use parking_lot::Mutex;
use tantivy::collector::{Count, TopDocs};
use tantivy::directory::MmapDirectory;
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, TantivyDocument, Term};

use crate::document::{FieldSpec, ModelKey, Record};
use crate::error::{Result, StackError};
use crate::indexes::IndexDefinition;

use super::{describe_schema, SchemaField, SearchBackend, SearchHit, SearchRequest, SearchResults};

const WRITER_HEAP_BYTES: usize = 50_000_000;

pub struct TantivyBackend {
    alias: String,
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    id_field: Field,
    model_field: Field,
    pk_field: Field,
    content_field: Field,
}

impl TantivyBackend {
    pub fn open(alias: impl Into<String>, path: &Path) -> Result<Self> {
        let alias = alias.into();
        std::fs::create_dir_all(path)?;

        let mut schema_builder = Schema::builder();
        let id_field = schema_builder.add_text_field("id", STRING | STORED);
        let model_field = schema_builder.add_text_field("model", STRING | STORED);
        let pk_field = schema_builder.add_text_field("pk", STRING | STORED);
        let content_field = schema_builder.add_text_field("content", TEXT | STORED);
        let schema = schema_builder.build();

        let directory = MmapDirectory::open(path)
            .map_err(|err| StackError::backend(&alias, format!("open {}: {err}", path.display())))?;
        let index = Index::open_or_create(directory, schema)
            .map_err(|err| StackError::backend(&alias, err))?;
        let reader = index
            .reader()
            .map_err(|err| StackError::backend(&alias, err))?;
        let writer = index
            .writer(WRITER_HEAP_BYTES)
            .map_err(|err| StackError::backend(&alias, err))?;

        Ok(Self {
            alias,
            index,
            reader,
            writer: Mutex::new(writer),
            id_field,
            model_field,
            pk_field,
            content_field,
        })
    }

    fn commit_writer(&self, writer: &mut IndexWriter) -> Result<()> {
        writer
            .commit()
            .map_err(|err| StackError::backend(&self.alias, err))?;
        self.reader
            .reload()
            .map_err(|err| StackError::backend(&self.alias, err))?;
        Ok(())
    }

    fn build_query(&self, request: &SearchRequest) -> Result<Box<dyn Query>> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        match &request.query {
            Some(text) => {
                let parser = QueryParser::for_index(&self.index, vec![self.content_field]);
                let parsed = parser
                    .parse_query(text)
                    .map_err(|err| StackError::Query(format!("parse '{text}': {err}")))?;
                clauses.push((Occur::Must, parsed));
            }
            None => clauses.push((Occur::Must, Box::new(AllQuery))),
        }

        if !request.models.is_empty() {
            let model_clauses: Vec<(Occur, Box<dyn Query>)> = request
                .models
                .iter()
                .map(|model| {
                    let term = Term::from_field_text(self.model_field, model.as_str());
                    let query: Box<dyn Query> =
                        Box::new(TermQuery::new(term, IndexRecordOption::Basic));
                    (Occur::Should, query)
                })
                .collect();
            clauses.push((Occur::Must, Box::new(BooleanQuery::new(model_clauses))));
        }

        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    fn field_text(&self, doc: &TantivyDocument, field: Field) -> String {
        doc.get_first(field)
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string()
    }
}

impl SearchBackend for TantivyBackend {
    fn update(&self, index: &IndexDefinition, records: &[Record], commit: bool) -> Result<()> {
        let mut writer = self.writer.lock();
        for record in records {
            let prepared = index.prepare(record);
            writer.delete_term(Term::from_field_text(self.id_field, &prepared.doc_id));
            writer
                .add_document(doc!(
                    self.id_field => prepared.doc_id,
                    self.model_field => prepared.model.as_str(),
                    self.pk_field => prepared.pk,
                    self.content_field => prepared.content,
                ))
                .map_err(|err| StackError::backend(&self.alias, err))?;
        }
        if commit {
            self.commit_writer(&mut writer)?;
        }
        Ok(())
    }

    fn remove(&self, doc_id: &str, commit: bool) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.delete_term(Term::from_field_text(self.id_field, doc_id));
        if commit {
            self.commit_writer(&mut writer)?;
        }
        Ok(())
    }

    fn clear(&self, commit: bool) -> Result<()> {
        let mut writer = self.writer.lock();
        writer
            .delete_all_documents()
            .map_err(|err| StackError::backend(&self.alias, err))?;
        if commit {
            self.commit_writer(&mut writer)?;
        }
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        self.commit_writer(&mut writer)
    }

    fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let searcher = self.reader.searcher();
        let query = self.build_query(request)?;

        let hits = searcher
            .search(&query, &Count)
            .map_err(|err| StackError::backend(&self.alias, err))?;
        if hits == 0 {
            return Ok(SearchResults::default());
        }

        let addresses = searcher
            .search(&query, &TopDocs::with_limit(hits))
            .map_err(|err| StackError::backend(&self.alias, err))?;

        let mut matched = Vec::with_capacity(addresses.len());
        for (_score, address) in addresses {
            let stored: TantivyDocument = searcher
                .doc(address)
                .map_err(|err| StackError::backend(&self.alias, err))?;
            matched.push(SearchHit {
                doc_id: self.field_text(&stored, self.id_field),
                model: ModelKey::new(self.field_text(&stored, self.model_field)),
                pk: self.field_text(&stored, self.pk_field),
                content: self.field_text(&stored, self.content_field),
            });
        }

        // Deterministic ordering across paginated scans; scoring is out of
        // scope for this engine.
        match request.order_by.as_deref() {
            Some("pk") => matched.sort_by(|a, b| a.pk.cmp(&b.pk)),
            _ => matched.sort_by(|a, b| a.doc_id.cmp(&b.doc_id)),
        }

        let limit = request.limit.unwrap_or(hits);
        let results = matched.into_iter().skip(request.start).take(limit).collect();

        Ok(SearchResults { hits, results })
    }

    fn build_schema(&self, fields: &[FieldSpec]) -> (String, Vec<SchemaField>) {
        describe_schema(fields)
    }
}
