//! Drag reorder tests
//!
//! Tests for live splicing of the dragged row or column into the rendered
//! window, drop rules (peer-only, cross-level, fixed sides) and the
//! guarantee that only a successful drop touches the dataset.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;
mod fixtures;

use common::*;
use gridview::config::DragTrigger;
use gridview::drag::{check_column_drop, splice_window, DropSide, DropTarget};
use gridview::layout::Pane;
use gridview::{ColumnDescriptor, ColumnId, FixedSide, GridEngine, GridError};
use proptest::prelude::*;
use test_case::test_case;

fn flat_grid(rows: usize) -> GridEngine {
    GridBuilder::new()
        .row_height(24.0)
        .row_drag(drag_config(false, false))
        .rows(flat_records(rows))
        .build()
}

fn tree_grid(peer_only: bool, cross_level: bool) -> GridEngine {
    GridBuilder::new()
        .tree(&["R", "A"])
        .row_drag(drag_config(peer_only, cross_level))
        .rows(family_tree())
        .build()
}

fn column_ids(engine: &GridEngine) -> Vec<String> {
    engine
        .columns()
        .leaves()
        .iter()
        .map(|c| c.id.as_str().to_string())
        .collect()
}

// ============================================================================
// Splicing
// ============================================================================

#[test_case(1, Some((3, DropSide::After)), vec![0, 2, 3, 1, 4] ; "moving down")]
#[test_case(3, Some((1, DropSide::Before)), vec![0, 3, 1, 2, 4] ; "moving up")]
#[test_case(2, None, vec![0, 1, 2, 3, 4] ; "no target yet")]
#[test_case(7, None, vec![0, 1, 2, 3, 4, 7] ; "origin below the window")]
fn test_splice_window(
    dragged: usize,
    target: Option<(usize, DropSide)>,
    expected: Vec<usize>,
) {
    let target = target.map(|(position, side)| DropTarget { position, side });
    assert_eq!(splice_window(0..5, dragged, target), expected);
}

#[test]
fn test_render_splices_dragged_row() {
    let mut engine = flat_grid(5);
    engine.drag_start_row(&rid("1"), (0.0, 30.0)).unwrap();
    let target = engine.drag_move((0.0, 90.0), 3).unwrap();
    assert_eq!(target.side, DropSide::After);

    let pass = render(&mut engine);
    assert_eq!(pane_row_ids(&pass, Pane::Main), ["0", "2", "3", "1", "4"]);
    let dragged = cell_at(&pass, Pane::Main, 1, 0).unwrap();
    assert!(dragged.params.flags.dragging);
    // Nothing moved in the dataset yet
    assert_eq!(flat_ids(&mut engine), ["0", "1", "2", "3", "4"]);
}

#[test]
fn test_hover_outside_window_clamps() {
    let mut engine = GridBuilder::new()
        .row_height(24.0)
        .row_drag(drag_config(false, false))
        .rows(flat_records(1000))
        .view(800.0, 240.0)
        .build();
    engine.drag_start_row(&rid("0"), (0.0, 0.0)).unwrap();
    let target = engine.drag_move((0.0, 0.0), 900).unwrap();
    assert_eq!(target.position, engine.row_window().end - 1);
}

// ============================================================================
// Row Drops
// ============================================================================

#[test]
fn test_drop_applies_move() {
    let mut engine = flat_grid(5);
    engine.drag_start_row(&rid("1"), (0.0, 0.0)).unwrap();
    engine.drag_move((0.0, 0.0), 3);
    assert!(engine.drag_end().unwrap());
    assert_eq!(flat_ids(&mut engine), ["0", "2", "3", "1", "4"]);
    assert!(engine.drag_state().is_none());
}

#[test]
fn test_drop_in_place_changes_nothing() {
    let mut engine = flat_grid(5);
    let version = engine.structure_version();
    engine.drag_start_row(&rid("2"), (0.0, 0.0)).unwrap();
    engine.drag_move((0.0, 0.0), 2);
    assert!(!engine.drag_end().unwrap());
    assert_eq!(engine.structure_version(), version);
}

#[test]
fn test_cancel_leaves_dataset_untouched() {
    let mut engine = flat_grid(5);
    let before = engine.export_rows();
    engine.drag_start_row(&rid("4"), (0.0, 0.0)).unwrap();
    engine.drag_move((0.0, 0.0), 0);
    assert!(engine.drag_cancel());
    assert_eq!(engine.export_rows(), before);
    assert!(!engine.drag_end().unwrap());
}

#[test]
fn test_peer_only_moves_among_siblings() {
    let mut engine = tree_grid(true, false);
    engine.drag_start_row(&rid("A.c1"), (0.0, 0.0)).unwrap();
    engine.drag_move((0.0, 0.0), 3);
    assert!(engine.drag_end().unwrap());
    assert_eq!(flat_ids(&mut engine), ["R", "A", "A.c2", "A.c1", "B"]);
}

#[test]
fn test_peer_only_rejects_parent_change() {
    let mut engine = tree_grid(true, false);
    let before = engine.export_rows();
    engine.drag_start_row(&rid("A.c1"), (0.0, 0.0)).unwrap();
    engine.drag_move((0.0, 0.0), 4);
    assert!(matches!(engine.drag_end(), Err(GridError::DragRejected(_))));
    assert_eq!(engine.export_rows(), before);
}

#[test]
fn test_cross_level_changes_parent() {
    let mut engine = tree_grid(false, true);
    engine.drag_start_row(&rid("B"), (0.0, 0.0)).unwrap();
    let target = engine.drag_move((0.0, 0.0), 2).unwrap();
    assert_eq!(target.side, DropSide::Before);
    assert!(engine.drag_end().unwrap());
    assert_eq!(flat_ids(&mut engine), ["R", "A", "B", "A.c1", "A.c2"]);
    assert_eq!(engine.flat_rows()[2].depth(), 2);
}

#[test]
fn test_drop_into_own_subtree_rejected() {
    let mut engine = tree_grid(false, true);
    engine.drag_start_row(&rid("A"), (0.0, 0.0)).unwrap();
    engine.drag_move((0.0, 0.0), 2);
    assert!(engine.drag_end().is_err());
    assert_eq!(flat_ids(&mut engine), ["R", "A", "A.c1", "A.c2", "B"]);
}

#[test]
fn test_nested_rows_need_a_level_rule() {
    let mut engine = tree_grid(false, false);
    assert!(engine.drag_start_row(&rid("A.c1"), (0.0, 0.0)).is_err());
    assert!(engine.drag_start_row(&rid("R"), (0.0, 0.0)).is_ok());
}

#[test]
fn test_second_drag_rejected() {
    let mut engine = flat_grid(5);
    engine.drag_start_row(&rid("0"), (0.0, 0.0)).unwrap();
    assert!(engine.drag_start_row(&rid("1"), (0.0, 0.0)).is_err());
}

#[test]
fn test_disabled_and_handleless_drags_rejected() {
    let mut engine = GridBuilder::new().rows(flat_records(3)).build();
    assert!(engine.drag_start_row(&rid("0"), (0.0, 0.0)).is_err());

    let mut drag = drag_config(false, false);
    drag.trigger = DragTrigger::Cell;
    let mut engine = GridBuilder::new().row_drag(drag).rows(flat_records(3)).build();
    assert!(engine.drag_start_row(&rid("0"), (0.0, 0.0)).is_err());
    assert!(engine
        .take_diagnostics()
        .iter()
        .any(|d| d.key == "rowDrag-handle"));
}

#[test]
fn test_removing_dragged_row_cancels_drag() {
    let mut engine = flat_grid(5);
    engine.drag_start_row(&rid("1"), (0.0, 0.0)).unwrap();
    engine.remove_rows(&[rid("1")]);
    engine.flush();
    assert!(engine.drag_state().is_none());
}

// ============================================================================
// Column Drops
// ============================================================================

#[test]
fn test_column_drag_reorders_leaves() {
    let mut engine = GridBuilder::new()
        .column_drag(drag_config(false, false))
        .columns(&["a", "b", "c"])
        .rows(flat_records(2))
        .build();
    engine.drag_start_column(&ColumnId::new("a"), (0.0, 0.0)).unwrap();
    engine.drag_move((0.0, 0.0), 2);

    let pass = render(&mut engine);
    let order: Vec<usize> = pass
        .pane(Pane::Main)
        .unwrap()
        .columns
        .iter()
        .map(|c| c.position)
        .collect();
    assert_eq!(order, [1, 2, 0]);

    assert!(engine.drag_end().unwrap());
    assert_eq!(column_ids(&engine), ["b", "c", "a"]);
}

#[test]
fn test_column_target_stays_on_its_side() {
    let mut engine = GridBuilder::new()
        .column_drag(drag_config(false, false))
        .column_descriptors(vec![
            fixed_column("l", FixedSide::Left),
            columns(&["a"]).remove(0),
            columns(&["b"]).remove(0),
        ])
        .rows(flat_records(2))
        .build();
    engine.drag_start_column(&ColumnId::new("b"), (0.0, 0.0)).unwrap();
    let target = engine.drag_move((0.0, 0.0), 0).unwrap();
    assert_eq!(target.position, 1);
    assert!(engine.drag_end().unwrap());
    assert_eq!(column_ids(&engine), ["l", "b", "a"]);
}

#[test]
fn test_column_dragged_out_of_group_drops_empty_group() {
    let group = ColumnDescriptor {
        title: Some("g".to_string()),
        ..ColumnDescriptor::default()
    }
    .with_children(columns(&["b"]));
    let mut engine = GridBuilder::new()
        .column_drag(drag_config(false, true))
        .column_descriptors(vec![columns(&["a"]).remove(0), group])
        .rows(flat_records(2))
        .build();
    assert!(engine.columns().is_grouped());

    engine.drag_start_column(&ColumnId::new("b"), (0.0, 0.0)).unwrap();
    engine.drag_move((0.0, 0.0), 0);
    assert!(engine.drag_end().unwrap());
    assert_eq!(column_ids(&engine), ["b", "a"]);
    assert!(!engine.columns().is_grouped());
}

#[test]
fn test_column_drop_across_panes_rejected() {
    let config = drag_config(false, true);
    assert!(check_column_drop(&config, &[0], &[1], false).is_err());
    assert!(check_column_drop(&config, &[0, 1], &[1, 0], true).is_ok());
    assert!(check_column_drop(&drag_config(false, false), &[0, 1], &[1, 0], true).is_err());
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Starting, moving and cancelling a drag never changes the dataset
    #[test]
    fn prop_drag_cancel_round_trip(
        rows in 1usize..60,
        origin in any::<prop::sample::Index>(),
        hovers in proptest::collection::vec(0usize..80, 0..5),
    ) {
        let mut engine = flat_grid(rows);
        let before = engine.export_rows();
        let id = rid(&origin.index(rows).to_string());
        engine.drag_start_row(&id, (0.0, 0.0)).unwrap();
        for hover in hovers {
            engine.drag_move((0.0, 0.0), hover);
            render(&mut engine);
        }
        prop_assert!(engine.drag_cancel());
        prop_assert_eq!(engine.export_rows(), before);
    }
}
