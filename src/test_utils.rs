//! Shared fixtures for unit and integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::connections::ConnectionRegistry;
use crate::document::{FieldKind, FieldSpec, ModelKey, Record};
use crate::engine::{update_index, UpdateOptions};
use crate::indexes::{AliasFilter, IndexDefinition};
use crate::sources::MemorySource;

pub fn text_field(name: &str, attr: Option<&str>, document: bool) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        attr: attr.map(str::to_string),
        document,
        faceted: false,
        stored: true,
        kind: FieldKind::Text,
    }
}

pub fn foo_records() -> Vec<Record> {
    vec![
        Record::new(1)
            .with_field("title", "Haystack test")
            .with_field("body", "foo 1"),
        Record::new(2)
            .with_field("title", "Another Haystack test")
            .with_field("body", "foo 2"),
    ]
}

pub fn bar_records() -> Vec<Record> {
    vec![
        Record::new(1)
            .with_field("author", "Haystack test")
            .with_field("content", "bar 1"),
        Record::new(2)
            .with_field("author", "Another Haystack test")
            .with_field("content", "bar 2"),
        Record::new(3)
            .with_field("author", "Yet another Haystack test")
            .with_field("content", "bar 3"),
    ]
}

pub struct RegistryFixture {
    pub registry: Arc<ConnectionRegistry>,
    pub foo_source: Arc<MemorySource>,
    pub bar_source: Arc<MemorySource>,
}

impl RegistryFixture {
    /// Run a committed full update of every model on one alias.
    pub fn index_all(&self, alias: &str) {
        update_index(
            &self.registry,
            &[],
            &[alias.to_string()],
            &UpdateOptions::default(),
        )
        .expect("index fixture data");
    }
}

/// Three memory connections mirroring a classic multi-backend layout:
/// `default` and `other` index everything, `filtered` excludes `BarIndex`
/// entirely and only accepts foo records whose body contains `"1"`.
pub fn two_connection_registry() -> RegistryFixture {
    let foo_source = MemorySource::new(foo_records());
    let bar_source = MemorySource::new(bar_records());

    let foo_index = Arc::new(
        IndexDefinition::new(
            "FooIndex",
            ModelKey::new("multipleindex.foo"),
            vec![
                text_field("text", Some("body"), true),
                text_field("title", None, false),
            ],
            Arc::clone(&foo_source) as Arc<dyn crate::sources::RecordSource>,
        )
        .unwrap()
        .with_alias_filter(
            "filtered",
            AliasFilter {
                field: "body".to_string(),
                contains: "1".to_string(),
            },
        ),
    );
    let bar_index = Arc::new(
        IndexDefinition::new(
            "BarIndex",
            ModelKey::new("multipleindex.bar"),
            vec![
                text_field("text", Some("content"), true),
                text_field("author", None, false),
            ],
            Arc::clone(&bar_source) as Arc<dyn crate::sources::RecordSource>,
        )
        .unwrap(),
    );

    let mut connections: BTreeMap<String, ConnectionConfig> = BTreeMap::new();
    connections.insert("default".to_string(), ConnectionConfig::default());
    connections.insert("other".to_string(), ConnectionConfig::default());
    connections.insert(
        "filtered".to_string(),
        ConnectionConfig {
            excluded_indexes: vec!["BarIndex".to_string()],
            ..ConnectionConfig::default()
        },
    );

    let registry = Arc::new(
        ConnectionRegistry::new(connections, vec![foo_index, bar_index]).unwrap(),
    );

    RegistryFixture {
        registry,
        foo_source,
        bar_source,
    }
}
