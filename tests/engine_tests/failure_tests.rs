//! Partial write tests
//!
//! These tests verify:
//! - Failures after ID allocation report the ID and the failed stage
//! - Partial writes under-index, never over-index
//! - `resume_create` and `reindex` repair them

use metaengine::{MetaError, WriteStage};

use crate::common::flaky_engine;

#[test]
fn test_store_failure_reports_allocated_id() {
    let (backend, engine) = flaky_engine();
    backend.fail_record_writes(true);

    let err = engine.create_record([("name", "alice")]).unwrap_err();

    match err {
        MetaError::IncompleteWrite { id, stage, .. } => {
            assert_eq!(id, 0);
            assert_eq!(stage, WriteStage::StoreFields);
        }
        other => panic!("expected IncompleteWrite, got {:?}", other),
    }
    assert!(engine.find_by_field("name", "alice").unwrap().is_empty());

    backend.fail_record_writes(false);
    engine.resume_create(0, [("name", "alice")]).unwrap();

    assert!(engine.find_by_field("name", "alice").unwrap().contains(&0));
    // Resuming never allocates
    assert_eq!(engine.last_id().unwrap(), Some(0));
    assert_eq!(engine.create_record([("name", "bob")]).unwrap(), 1);
}

#[test]
fn test_index_failure_leaves_record_under_indexed() {
    let (backend, engine) = flaky_engine();
    backend.fail_index_writes(true);

    let err = engine.create_record([("name", "alice")]).unwrap_err();

    assert!(matches!(
        err,
        MetaError::IncompleteWrite { id: 0, stage: WriteStage::UpdateIndex, .. }
    ));
    assert!(err.is_transport());
    assert_eq!(engine.get_field(0, "name").unwrap().as_deref(), Some("alice"));
    assert!(engine.find_by_field("name", "alice").unwrap().is_empty());

    backend.fail_index_writes(false);
    engine.reindex(0).unwrap();

    assert!(engine.find_by_field("name", "alice").unwrap().contains(&0));
}

#[test]
fn test_append_failure_never_over_indexes() {
    let (backend, engine) = flaky_engine();
    let id = engine.create_record([("status", "new")]).unwrap();

    backend.fail_record_writes(true);
    let err = engine.append_to_record(id, [("status", "done")]).unwrap_err();
    assert!(matches!(
        err,
        MetaError::IncompleteWrite { stage: WriteStage::StoreFields, .. }
    ));

    // The record still holds the old value; no index entry points at the new one
    assert_eq!(engine.get_field(id, "status").unwrap().as_deref(), Some("new"));
    assert!(engine.find_by_field("status", "done").unwrap().is_empty());

    backend.fail_record_writes(false);
    engine.reindex(id).unwrap();
    assert!(engine.find_by_field("status", "new").unwrap().contains(&id));
}

#[test]
fn test_resume_create_rejects_unallocated_ids() {
    let (_backend, engine) = flaky_engine();
    assert!(matches!(
        engine.resume_create(0, [("name", "alice")]),
        Err(MetaError::RecordNotFound(0))
    ));
}

#[test]
fn test_resume_create_replaces_partial_content() {
    let (_backend, engine) = flaky_engine();
    let id = engine.create_record([("name", "alice"), ("stale", "x")]).unwrap();

    engine.resume_create(id, [("name", "alice")]).unwrap();

    assert_eq!(engine.get_field(id, "stale").unwrap(), None);
    assert!(engine.find_by_field("stale", "x").unwrap().is_empty());
}

#[test]
fn test_reindex_missing_record() {
    let (_backend, engine) = flaky_engine();
    assert!(matches!(engine.reindex(3), Err(MetaError::RecordNotFound(3))));
}
