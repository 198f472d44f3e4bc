//! Engine integration tests
//!
//! Tests for configuration, dataset mutations, deferred window recomputes,
//! programmatic scrolling, column sizing and one-shot snapshot rendering.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;
mod fixtures;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;
use gridview::config::GridConfig;
use gridview::layout::Pane;
use gridview::viewer::WindowSnapshot;
use gridview::{ColumnDescriptor, ColumnId, GridEngine, GridError, Snapshot};
use serde_json::json;
use test_case::test_case;

// ============================================================================
// Configuration
// ============================================================================

#[test_case(r#"{"row": {"height": 0}}"# ; "zero row height")]
#[test_case(r#"{"column": {"defaultWidth": -5}}"# ; "negative width")]
#[test_case(r#"{"virtualY": {"capacityFactor": 0}}"# ; "zero capacity factor")]
fn test_impossible_sizes_rejected(json: &str) {
    assert!(matches!(
        GridEngine::from_json(json),
        Err(GridError::Configuration(_))
    ));
}

#[test]
fn test_config_from_json() {
    let engine = GridEngine::from_json(
        r#"{"row": {"height": 24, "keyFields": ["id"]}, "virtualY": {"preload": 3}}"#,
    )
    .unwrap();
    assert_eq!(engine.config().fixed_row_height(), Some(24.0));
    assert_eq!(engine.config().virtual_y.preload, 3);
}

#[test]
fn test_drag_rule_conflict_reported() {
    let mut config = GridConfig::default();
    config.row_drag = drag_config(true, true);
    let mut engine = GridEngine::new(config).unwrap();
    assert!(!engine.config().row_drag.cross_level);
    let diagnostics = engine.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].key, "rowDrag-conflict");
}

// ============================================================================
// Dataset Mutations
// ============================================================================

#[test]
fn test_insert_under_parent() {
    let mut engine = GridBuilder::new().tree(&["R"]).rows(family_tree()).build();
    let ids = engine
        .insert_rows(vec![node("N", vec![])], Some(&rid("R")), Some(1))
        .unwrap();
    assert_eq!(ids, [rid("N")]);
    assert_eq!(flat_ids(&mut engine), ["R", "A", "N", "B"]);

    assert!(engine
        .insert_rows(vec![node("X", vec![])], Some(&rid("missing")), None)
        .is_err());
}

#[test]
fn test_insert_colliding_key_gets_positional_identity() {
    let mut engine = GridBuilder::new().rows(flat_records(3)).build();
    let ids = engine.insert_rows(vec![json!({"id": 1})], None, None).unwrap();
    assert_ne!(ids[0], rid("1"));
    assert_eq!(flat_ids(&mut engine).len(), 4);
    assert!(engine
        .take_diagnostics()
        .iter()
        .any(|d| d.key == "identity-collision:1"));
}

#[test]
fn test_remove_takes_subtree() {
    let mut engine = GridBuilder::new()
        .tree(&["R", "A"])
        .rows(family_tree())
        .build();
    assert_eq!(engine.remove_rows(&[rid("A"), rid("missing")]), 1);
    assert_eq!(flat_ids(&mut engine), ["R", "B"]);
    assert!(engine.record(&rid("A.c1")).is_none());
}

#[test]
fn test_update_keeps_identity_and_children() {
    let mut engine = GridBuilder::new()
        .tree(&["R", "A"])
        .rows(family_tree())
        .build();
    let version = engine.structure_version();
    engine
        .update_row(&rid("A"), json!({"id": "A", "name": "renamed", "children": []}))
        .unwrap();
    assert_eq!(engine.structure_version(), version);
    assert_eq!(engine.record(&rid("A")).unwrap()["name"], "renamed");
    assert_eq!(flat_ids(&mut engine), ["R", "A", "A.c1", "A.c2", "B"]);
}

#[test]
fn test_export_nests_children() {
    let engine = GridBuilder::new().tree(&["R"]).rows(family_tree()).build();
    let exported = engine.export_rows();
    assert_eq!(exported.len(), 1);
    let children = exported[0]["children"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["children"][1]["id"], "A.c2");
}

#[test]
fn test_surrogate_identity_survives_round_trip() {
    let mut engine = GridBuilder::new()
        .config(|c| c.row.key_fields.clear())
        .rows(vec![json!({"name": "a"}), json!({"name": "b"})])
        .build();
    let before = flat_ids(&mut engine);
    let exported = engine.export_rows();
    assert!(exported[0].get("_rowid").is_some());
    engine.load_rows(exported);
    assert_eq!(flat_ids(&mut engine), before);
}

#[test]
fn test_structure_rebuilt_lazily() {
    let mut engine = GridBuilder::new().tree(&[]).rows(family_tree()).build();
    let version = engine.structure_version();
    engine.set_all_row_expand(true);
    engine.set_all_row_expand(false);
    engine.set_all_row_expand(true);
    assert_eq!(engine.structure_version(), version + 3);
    assert_eq!(engine.row_index().version(), version + 3);
}

// ============================================================================
// Deferred Recompute
// ============================================================================

#[test]
fn test_scroll_events_coalesce() {
    let mut engine = GridBuilder::new()
        .row_height(24.0)
        .rows(flat_records(10_000))
        .view(800.0, 480.0)
        .build();
    let seen: Rc<RefCell<Option<WindowSnapshot>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    engine.after_render(Box::new(move |snapshot: &WindowSnapshot| {
        *sink.borrow_mut() = Some(snapshot.clone());
    }));
    engine.on_wheel(0.0, 240.0);
    engine.on_wheel(0.0, 240.0);
    engine.on_wheel(0.0, 240.0);

    let report = engine.flush();
    assert_eq!(report.coalesced, 2);
    assert!(report.recomputed.is_some());
    assert_eq!(report.callbacks_run, 1);

    // The callback saw the recomputed window
    let snapshot = seen.borrow().clone().unwrap();
    assert_eq!(snapshot.rows, engine.row_window().materialized());
    assert_eq!(snapshot.rows.start, 25);
}

#[test]
fn test_idle_flush_does_nothing() {
    let mut engine = GridBuilder::new().rows(flat_records(10)).build();
    let report = engine.flush();
    assert_eq!(report.recomputed, None);
    assert_eq!(report.callbacks_run, 0);
}

#[test]
fn test_callbacks_run_once() {
    let mut engine = GridBuilder::new().rows(flat_records(10)).build();
    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    engine.after_render(Box::new(move |_: &WindowSnapshot| *sink.borrow_mut() += 1));
    engine.flush();
    engine.flush();
    assert_eq!(*count.borrow(), 1);
}

// ============================================================================
// Programmatic Scrolling
// ============================================================================

#[test]
fn test_scroll_to_row_below_aligns_bottom() {
    let mut engine = GridBuilder::new()
        .row_height(24.0)
        .rows(flat_records(100))
        .view(800.0, 240.0)
        .build();
    let update = engine.scroll_to_row(&rid("20")).unwrap().unwrap();
    assert_eq!(update.top, 21.0 * 24.0 - 240.0);
    // Already visible: no scroll
    assert!(engine.scroll_to_row(&rid("15")).unwrap().is_none());
}

#[test]
fn test_scroll_to_hidden_row_errors() {
    let mut engine = GridBuilder::new().tree(&[]).rows(family_tree()).build();
    assert!(engine.scroll_to_row(&rid("A")).is_err());
}

#[test]
fn test_scroll_to_column() {
    let mut engine = GridBuilder::new()
        .columns(&["a", "b", "c", "d", "e", "f"])
        .rows(flat_records(5))
        .view(250.0, 200.0)
        .build();
    let update = engine.scroll_to_column(&ColumnId::new("d")).unwrap().unwrap();
    assert_eq!(update.left, 150.0);
    assert!(engine.scroll_to_column(&ColumnId::new("nope")).is_err());
}

// ============================================================================
// Column Sizing
// ============================================================================

#[test]
fn test_auto_width_follows_resize() {
    let mut auto = ColumnDescriptor::new("notes");
    auto.auto_width = true;
    let mut engine = GridBuilder::new()
        .column_descriptors(vec![ColumnDescriptor::new("name").with_width(100.0), auto])
        .rows(flat_records(2))
        .view(800.0, 300.0)
        .build();
    assert_eq!(engine.columns().leaves()[1].width, 700.0);
    engine.resize(500.0, 300.0);
    assert_eq!(engine.columns().leaves()[1].width, 400.0);
    engine.resize(100.0, 300.0);
    assert_eq!(
        engine.columns().leaves()[1].width,
        gridview::config::DEFAULT_MIN_COL_WIDTH
    );
}

#[test]
fn test_resize_clamps_to_min_width() {
    let mut engine = GridBuilder::new().columns(&["a"]).rows(flat_records(1)).build();
    assert!(engine.set_column_width(&ColumnId::new("a"), 5.0));
    assert_eq!(
        engine.columns().leaves()[0].width,
        gridview::config::DEFAULT_MIN_COL_WIDTH
    );
    assert!(!engine.set_column_width(&ColumnId::new("zz"), 50.0));
}

#[test]
fn test_grouped_columns_flatten_to_leaves() {
    let group = ColumnDescriptor {
        title: Some("Person".to_string()),
        ..ColumnDescriptor::default()
    }
    .with_children(vec![
        ColumnDescriptor::new("first"),
        ColumnDescriptor::new("last"),
    ]);
    let engine = GridBuilder::new()
        .column_descriptors(vec![ColumnDescriptor::new("id"), group])
        .rows(flat_records(1))
        .build();
    assert_eq!(engine.columns().len(), 3);
    assert!(engine.columns().is_grouped());
    let person = &engine.columns().groups()[0];
    assert_eq!(person.leaves.len(), 2);
    assert_eq!(engine.columns().leaves()[1].parent, Some(person.id.clone()));
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_snapshot_renders_tree_and_merges() {
    let snapshot = Snapshot::from_json(
        &json!({
            "config": {"row": {"height": 24, "keyFields": ["id"]}, "tree": {}},
            "columns": [{"field": "name"}, {"field": "id"}],
            "rows": family_tree(),
            "expanded": ["R", "A"],
            "merges": [{"row": 0, "col": 0, "rowspan": 1, "colspan": 2}],
            "view": {"width": 600, "height": 400}
        })
        .to_string(),
    )
    .unwrap();
    let (pass, diagnostics) = snapshot.render().unwrap();
    assert!(diagnostics.is_empty());
    assert_eq!(
        pane_row_ids(&pass, Pane::Main),
        ["R", "A", "A.c1", "A.c2", "B"]
    );
    assert_span(&pass, 0, 0, 1, 2);
    assert_suppressed(&pass, 0, 1);
}

#[test]
fn test_snapshot_rejects_bad_config() {
    let snapshot = Snapshot::from_json(r#"{"config": {"row": {"height": -1}}}"#).unwrap();
    assert!(snapshot.render().is_err());
}
