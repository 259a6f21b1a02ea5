//! End-to-end indexing engine scenarios against the memory engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use searchstack::config::ConnectionConfig;
use searchstack::document::{ModelKey, Record};
use searchstack::engine::{clear_index, update_index, UpdateOptions};
use searchstack::sources::MemorySource;
use searchstack::test_utils::{text_field, two_connection_registry};
use searchstack::{ConnectionRegistry, IndexDefinition, SearchQuerySet};

fn count(registry: &Arc<ConnectionRegistry>, alias: &str) -> usize {
    SearchQuerySet::new(Arc::clone(registry), Some(alias))
        .count()
        .expect("count")
}

fn search_hits(registry: &Arc<ConnectionRegistry>, alias: &str, query: &str) -> usize {
    SearchQuerySet::new(Arc::clone(registry), Some(alias))
        .query(query)
        .count()
        .expect("search")
}

/// A single-connection registry over one mock model with `total` records,
/// each published `total - pk` hours ago.
fn mock_registry(total: usize) -> (Arc<ConnectionRegistry>, Arc<MemorySource>) {
    let now = Utc::now();
    let records: Vec<Record> = (1..=total)
        .map(|pk| {
            Record::new(pk as i64)
                .with_field("body", format!("mock record {pk}"))
                .with_pub_date(now - Duration::hours((total - pk) as i64))
        })
        .collect();
    let source = MemorySource::new(records);

    let definition = Arc::new(
        IndexDefinition::new(
            "MockIndex",
            ModelKey::new("core.mockmodel"),
            vec![text_field("text", Some("body"), true)],
            Arc::clone(&source) as Arc<dyn searchstack::sources::RecordSource>,
        )
        .unwrap(),
    );

    let mut connections = BTreeMap::new();
    connections.insert("default".to_string(), ConnectionConfig::default());
    let registry =
        Arc::new(ConnectionRegistry::new(connections, vec![definition]).unwrap());
    (registry, source)
}

#[test]
fn multi_connection_updates_are_isolated() {
    let fixture = two_connection_registry();

    fixture.index_all("default");
    assert_eq!(search_hits(&fixture.registry, "default", "foo"), 2);
    assert_eq!(search_hits(&fixture.registry, "other", "foo"), 0);

    fixture.index_all("other");
    assert_eq!(search_hits(&fixture.registry, "default", "foo"), 2);
    assert_eq!(search_hits(&fixture.registry, "other", "foo"), 2);

    // Bar was indexed everywhere it is registered.
    assert_eq!(count(&fixture.registry, "default"), 5);
    assert_eq!(count(&fixture.registry, "other"), 5);
}

#[test]
fn filtered_connection_indexes_a_subset() {
    let fixture = two_connection_registry();
    fixture.index_all("default");
    fixture.index_all("filtered");

    assert_eq!(search_hits(&fixture.registry, "default", "foo"), 2);
    // The alias filter keeps only "foo 1"; BarIndex is excluded outright.
    assert_eq!(search_hits(&fixture.registry, "filtered", "foo"), 1);
    assert_eq!(count(&fixture.registry, "filtered"), 1);
}

#[test]
fn update_is_idempotent_without_data_changes() {
    let fixture = two_connection_registry();
    fixture.index_all("default");
    let before = count(&fixture.registry, "default");

    fixture.index_all("default");
    assert_eq!(count(&fixture.registry, "default"), before);
}

#[test]
fn uncommitted_update_stays_invisible() {
    let (registry, _source) = mock_registry(23);
    let opts = UpdateOptions {
        commit: false,
        ..UpdateOptions::default()
    };
    update_index(&registry, &[], &["default".to_string()], &opts).unwrap();
    assert_eq!(count(&registry, "default"), 0);

    update_index(&registry, &[], &["default".to_string()], &UpdateOptions::default()).unwrap();
    assert_eq!(count(&registry, "default"), 23);
}

#[test]
fn stale_records_removed_only_with_remove_flag_and_commit() {
    let (registry, source) = mock_registry(23);
    update_index(&registry, &[], &["default".to_string()], &UpdateOptions::default()).unwrap();
    assert_eq!(count(&registry, "default"), 23);

    // Remove several rows, two of which land in the same scan page.
    source.delete(&json!(1));
    source.delete(&json!(2));
    source.delete(&json!(8));
    assert_eq!(count(&registry, "default"), 23);

    // Plain update doesn't fix it.
    update_index(&registry, &[], &["default".to_string()], &UpdateOptions::default()).unwrap();
    assert_eq!(count(&registry, "default"), 23);

    // Remove without commit also doesn't affect queries...
    let opts = UpdateOptions {
        remove: true,
        batch_size: Some(2),
        commit: false,
        ..UpdateOptions::default()
    };
    update_index(&registry, &[], &["default".to_string()], &opts).unwrap();
    assert_eq!(count(&registry, "default"), 23);

    // ...but remove with commit does.
    let opts = UpdateOptions {
        remove: true,
        batch_size: Some(2),
        ..UpdateOptions::default()
    };
    update_index(&registry, &[], &["default".to_string()], &opts).unwrap();
    assert_eq!(count(&registry, "default"), 20);

    // Surviving documents are exactly the database ∩ index set.
    let pairs = SearchQuerySet::new(Arc::clone(&registry), None)
        .models([ModelKey::new("core.mockmodel")])
        .pk_and_doc_id(0, 23)
        .unwrap();
    assert!(pairs.iter().all(|(pk, _)| !["1", "2", "8"].contains(&pk.as_str())));
}

#[test]
fn reconciliation_skips_models_with_empty_record_sets() {
    let (registry, source) = mock_registry(5);
    update_index(&registry, &[], &["default".to_string()], &UpdateOptions::default()).unwrap();
    source.replace_all(vec![]);

    // Empty unrestricted set: reconciliation is a no-op, not a wipe.
    let opts = UpdateOptions {
        remove: true,
        ..UpdateOptions::default()
    };
    update_index(&registry, &[], &["default".to_string()], &opts).unwrap();
    assert_eq!(count(&registry, "default"), 5);
}

#[test]
fn date_filtered_update_never_misclassifies_live_records_as_stale() {
    let (registry, source) = mock_registry(23);
    update_index(&registry, &[], &["default".to_string()], &UpdateOptions::default()).unwrap();
    source.delete(&json!(3));

    // A narrow window with remove must still rebuild the full pk list:
    // only pk 3 disappears, not everything outside the window.
    let opts = UpdateOptions {
        remove: true,
        age_hours: Some(1),
        ..UpdateOptions::default()
    };
    update_index(&registry, &[], &["default".to_string()], &opts).unwrap();
    assert_eq!(count(&registry, "default"), 22);
}

#[test]
fn age_limits_what_gets_indexed() {
    let (registry, _source) = mock_registry(23);

    // pub_dates step back one hour per pk: records 21..=23 are younger
    // than three hours.
    let opts = UpdateOptions {
        age_hours: Some(3),
        ..UpdateOptions::default()
    };
    update_index(&registry, &[], &["default".to_string()], &opts).unwrap();
    assert_eq!(count(&registry, "default"), 3);
}

#[test]
fn explicit_date_window_overrides_age() {
    let (registry, _source) = mock_registry(23);
    let now = Utc::now();

    let opts = UpdateOptions {
        age_hours: Some(1),
        start_date: Some(now - Duration::hours(5) - Duration::minutes(30)),
        end_date: Some(now - Duration::hours(2) - Duration::minutes(30)),
        ..UpdateOptions::default()
    };
    update_index(&registry, &[], &["default".to_string()], &opts).unwrap();

    // Ages 3, 4, and 5 hours fall inside the window.
    assert_eq!(count(&registry, "default"), 3);
}

#[test]
fn clear_affects_only_target_aliases() {
    let fixture = two_connection_registry();
    fixture.index_all("default");
    fixture.index_all("other");

    clear_index(&fixture.registry, &["default".to_string()], true).unwrap();
    assert_eq!(count(&fixture.registry, "default"), 0);
    assert_eq!(count(&fixture.registry, "other"), 5);
}

#[test]
fn parallel_and_serial_updates_agree() {
    let (serial_registry, _s1) = mock_registry(23);
    let (parallel_registry, _s2) = mock_registry(23);

    update_index(
        &serial_registry,
        &[],
        &["default".to_string()],
        &UpdateOptions {
            batch_size: Some(4),
            ..UpdateOptions::default()
        },
    )
    .unwrap();

    update_index(
        &parallel_registry,
        &[],
        &["default".to_string()],
        &UpdateOptions {
            batch_size: Some(4),
            workers: 3,
            ..UpdateOptions::default()
        },
    )
    .unwrap();

    assert_eq!(count(&serial_registry, "default"), 23);
    assert_eq!(count(&parallel_registry, "default"), 23);
}

#[test]
fn unknown_alias_aborts_the_run() {
    let (registry, _source) = mock_registry(3);
    let err = update_index(
        &registry,
        &[],
        &["ghost".to_string()],
        &UpdateOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, searchstack::StackError::Config(_)));
}
