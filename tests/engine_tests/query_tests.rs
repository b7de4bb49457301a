//! Query engine tests
//!
//! These tests verify:
//! - Component queries return empty collections, boundary methods `NoMatch`
//! - Unprocessed filtering
//! - Whole-table scans and bulk tagging

use std::collections::BTreeMap;

use metaengine::{MetaEngine, MetaError};

fn engine_with_batch() -> MetaEngine {
    let engine = MetaEngine::in_memory().unwrap();
    engine.create_record([("batch", "a"), ("name", "r0")]).unwrap();
    engine.create_record([("batch", "b"), ("name", "r1")]).unwrap();
    engine
        .create_record([("batch", "a"), ("name", "r2"), ("done", "yes")])
        .unwrap();
    engine.create_record([("batch", "a"), ("name", "r3")]).unwrap();
    engine
}

// =============================================================================
// Find Tests
// =============================================================================

#[test]
fn test_find_by_field() {
    let engine = engine_with_batch();
    let ids: Vec<_> = engine.find_by_field("batch", "a").unwrap().into_iter().collect();
    assert_eq!(ids, vec![0, 2, 3]);
}

#[test]
fn test_component_queries_return_empty() {
    let engine = engine_with_batch();
    let query = engine.query();

    assert!(query.find_by_field("batch", "zzz").unwrap().is_empty());
    assert!(query.find_all("batch", "zzz").unwrap().is_empty());
    assert!(query.find_unprocessed("batch", "zzz", "done").unwrap().is_empty());
}

#[test]
fn test_boundary_queries_report_no_match() {
    let engine = engine_with_batch();

    assert!(matches!(
        engine.get_records("batch", "zzz"),
        Err(MetaError::NoMatch)
    ));
    assert!(matches!(
        engine.get_unprocessed_records("batch", "b", "name"),
        Err(MetaError::NoMatch)
    ));
}

#[test]
fn test_get_records_materializes_fields() {
    let engine = engine_with_batch();
    let records = engine.get_records("batch", "a").unwrap();

    assert_eq!(records.keys().copied().collect::<Vec<_>>(), vec![0, 2, 3]);
    assert_eq!(records[&2]["done"], "yes");
    assert_eq!(records[&3]["name"], "r3");
}

#[test]
fn test_unprocessed_excludes_records_with_field() {
    let engine = engine_with_batch();
    let pending = engine.get_unprocessed_records("batch", "a", "done").unwrap();

    let expected: BTreeMap<u64, String> =
        [(0, "a".to_string()), (3, "a".to_string())].into_iter().collect();
    assert_eq!(pending, expected);
}

#[test]
fn test_unprocessed_shrinks_after_append() {
    let engine = engine_with_batch();
    engine.append_to_record(0, [("done", "yes")]).unwrap();
    engine.append_to_record(3, [("done", "")]).unwrap();

    // An empty value still counts as present
    assert!(matches!(
        engine.get_unprocessed_records("batch", "a", "done"),
        Err(MetaError::NoMatch)
    ));
}

#[test]
fn test_exclude_equal_to_search_name() {
    let engine = engine_with_batch();
    assert!(engine
        .query()
        .find_unprocessed("batch", "a", "batch")
        .unwrap()
        .is_empty());
}

#[test]
fn test_values_are_matched_exactly() {
    let engine = MetaEngine::in_memory().unwrap();
    engine.create_record([("tag", "a:b")]).unwrap();
    engine.create_record([("tag:a", "b")]).unwrap();

    assert_eq!(engine.find_by_field("tag", "a:b").unwrap().len(), 1);
    assert_eq!(engine.find_by_field("tag:a", "b").unwrap().len(), 1);
    assert!(engine.find_by_field("tag", "a").unwrap().is_empty());
    assert!(engine.find_by_field("Tag", "a:b").unwrap().is_empty());
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_whole_table() {
    let engine = engine_with_batch();
    let rows: Vec<_> = engine.scan().unwrap().collect::<Result<_, _>>().unwrap();

    assert_eq!(rows.len(), 4);
    assert_eq!(
        rows.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
    assert_eq!(rows[1].1["name"], "r1");
}

#[test]
fn test_scan_empty_table() {
    let engine = MetaEngine::in_memory().unwrap();
    assert_eq!(engine.scan().unwrap().count(), 0);
}

// =============================================================================
// Bulk Tagging Tests
// =============================================================================

#[test]
fn test_add_field_to_all_matched() {
    let engine = engine_with_batch();

    let updated = engine.add_field_to_all_matched("batch", "a", "owner", "ops").unwrap();

    assert_eq!(updated, 3);
    let owned: Vec<_> = engine.find_by_field("owner", "ops").unwrap().into_iter().collect();
    assert_eq!(owned, vec![0, 2, 3]);
    assert_eq!(engine.get_field(1, "owner").unwrap(), None);
}

#[test]
fn test_add_field_to_no_matches() {
    let engine = engine_with_batch();
    assert_eq!(
        engine.add_field_to_all_matched("batch", "zzz", "owner", "ops").unwrap(),
        0
    );
}

#[test]
fn test_tag_overwrites_match_field() {
    let engine = engine_with_batch();

    engine.add_field_to_all_matched("batch", "a", "batch", "archived").unwrap();

    assert!(engine.find_by_field("batch", "a").unwrap().is_empty());
    assert_eq!(engine.find_by_field("batch", "archived").unwrap().len(), 3);
}
