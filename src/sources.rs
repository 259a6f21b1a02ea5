//! Record sources: the seam to the authoritative store.
//!
//! The indexing engine never talks to a database directly; it pulls rows
//! through `RecordSource`. The CLI wires JSON fixture files, tests use the
//! mutable in-memory source.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::document::Record;
use crate::error::{Result, StackError};

pub trait RecordSource: Send + Sync {
    /// All rows, in no particular order. Ordering is applied by the index
    /// definition.
    fn records(&self) -> Result<Vec<Record>>;
}

/// Reads a JSON array of records from disk on every call, so external edits
/// to the fixture are picked up between runs.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for JsonFileSource {
    fn records(&self) -> Result<Vec<Record>> {
        let raw = std::fs::read_to_string(&self.path).map_err(|err| {
            StackError::Config(format!("read records {}: {err}", self.path.display()))
        })?;
        let records: Vec<Record> = serde_json::from_str(&raw)?;
        Ok(records)
    }
}

/// In-memory source with interior mutability so tests can delete or update
/// rows between indexing runs.
#[derive(Default)]
pub struct MemorySource {
    records: RwLock<Vec<Record>>,
}

impl MemorySource {
    pub fn new(records: Vec<Record>) -> Arc<Self> {
        Arc::new(Self {
            records: RwLock::new(records),
        })
    }

    pub fn insert(&self, record: Record) {
        self.records.write().push(record);
    }

    pub fn delete(&self, pk: &serde_json::Value) {
        let canonical = crate::document::canonical_pk(pk);
        self.records
            .write()
            .retain(|record| record.canonical_pk() != canonical);
    }

    pub fn replace_all(&self, records: Vec<Record>) {
        *self.records.write() = records;
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl RecordSource for MemorySource {
    fn records(&self) -> Result<Vec<Record>> {
        Ok(self.records.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_source_delete_by_pk() {
        let source = MemorySource::new(vec![Record::new(1), Record::new(2), Record::new(3)]);
        source.delete(&json!(2));
        let pks: Vec<String> = source
            .records()
            .unwrap()
            .iter()
            .map(Record::canonical_pk)
            .collect();
        assert_eq!(pks, vec!["1", "3"]);
    }

    #[test]
    fn json_file_source_parses_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        std::fs::write(
            &path,
            r#"[{"pk": 1, "fields": {"body": "foo 1"}}, {"pk": 2, "fields": {"body": "foo 2"}}]"#,
        )
        .unwrap();

        let source = JsonFileSource::new(&path);
        let records = source.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields["body"], "foo 1");
    }

    #[test]
    fn json_file_source_missing_file_is_config_error() {
        let source = JsonFileSource::new("/nonexistent/rows.json");
        assert!(matches!(
            source.records(),
            Err(StackError::Config(_))
        ));
    }
}
