//! Fixed pane synchronization tests
//!
//! Tests for vertical lockstep between the left, main and right panes,
//! echo suppression of programmatic writes and the column lists each pane
//! renders.

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
use gridview::layout::Pane;
use gridview::render::rows_aligned;
use gridview::{ColumnDescriptor, FixedSide, GridEngine, SpanHint};

/// `l | a b c | r` with 1000 rows in a body narrower than the columns
fn fixed_grid() -> GridEngine {
    let mut cols = vec![fixed_column("l", FixedSide::Left)];
    cols.extend(columns(&["a", "b", "c"]));
    cols.push(fixed_column("r", FixedSide::Right));
    GridBuilder::new()
        .row_height(24.0)
        .column_descriptors(cols)
        .rows(flat_records(1000))
        .view(400.0, 480.0)
        .build()
}

fn write_panes(update: &gridview::layout::ScrollUpdate) -> Vec<Pane> {
    update.writes.iter().map(|w| w.pane).collect()
}

// ============================================================================
// Scroll Lockstep
// ============================================================================

#[test]
fn test_main_scroll_writes_fixed_panes() {
    let mut engine = fixed_grid();
    let update = engine.on_scroll(Pane::Main, 240.0, 0.0).unwrap();
    assert_eq!(write_panes(&update), [Pane::Left, Pane::Right]);
    assert!(update.writes.iter().all(|w| w.top == 240.0 && w.left.is_none()));

    // The fixed panes echo the write back
    assert!(engine.on_scroll(Pane::Left, 240.3, 0.0).is_none());
    assert!(engine.on_scroll(Pane::Right, 240.0, 0.0).is_none());

    engine.flush();
    assert_eq!(engine.row_window().visible_start, 10);
}

#[test]
fn test_fixed_pane_scroll_drives_main() {
    let mut engine = fixed_grid();
    let update = engine.on_scroll(Pane::Left, 480.0, 0.0).unwrap();
    assert_eq!(write_panes(&update), [Pane::Main, Pane::Right]);
    assert_eq!(update.writes[0].left, Some(0.0));
    assert_eq!(engine.viewport().scroll_y, 480.0);
}

#[test]
fn test_horizontal_scroll_leaves_fixed_panes_alone() {
    let mut engine = fixed_grid();
    let update = engine.on_scroll(Pane::Main, 0.0, 60.0).unwrap();
    assert!(update.horizontal && !update.vertical);
    assert!(update.writes.is_empty());
    assert_eq!(engine.viewport().scroll_x, 60.0);
}

#[test]
fn test_horizontal_scroll_is_clamped_to_body() {
    let mut engine = fixed_grid();
    // Body is 400 - 80 - 80 = 240px over 300px of scrollable columns
    let update = engine.on_wheel(500.0, 0.0).unwrap();
    assert_eq!(update.left, 60.0);
}

#[test]
fn test_echo_forgotten_after_content_shrinks() {
    let mut engine = fixed_grid();
    engine.on_scroll(Pane::Main, 20_000.0, 0.0).unwrap();
    engine.load_rows(flat_records(10));
    engine.flush();
    assert_eq!(engine.viewport().scroll_y, 0.0);
    // A fixed pane reporting the clamped position is not a new scroll
    assert!(engine.on_scroll(Pane::Left, 0.0, 0.0).is_none());
    // A stale echo of the old write clamps into the empty range
    assert!(engine.on_scroll(Pane::Right, 20_000.0, 0.0).is_none());
    assert_eq!(engine.viewport().scroll_y, 0.0);
}

#[test]
fn test_single_pane_grid_issues_no_writes() {
    let mut engine = GridBuilder::new()
        .row_height(24.0)
        .rows(flat_records(1000))
        .view(400.0, 480.0)
        .build();
    let update = engine.on_scroll(Pane::Main, 100.0, 0.0).unwrap();
    assert!(update.writes.is_empty());
    let pass = render(&mut engine);
    assert_eq!(pass.panes.len(), 1);
}

// ============================================================================
// Pane Column Lists
// ============================================================================

#[test]
fn test_panes_render_aligned_rows() {
    let mut engine = fixed_grid();
    engine.scroll_to(1000.0, 0.0);
    let pass = render(&mut engine);
    assert_eq!(pass.panes.len(), 3);
    assert!(rows_aligned(&pass.panes));
    assert_eq!(
        pane_row_ids(&pass, Pane::Left),
        pane_row_ids(&pass, Pane::Main)
    );
    assert!(!engine
        .take_diagnostics()
        .iter()
        .any(|d| d.key == "pane-alignment"));
}

#[test]
fn test_optimize_mode_lists_own_columns() {
    let mut engine = fixed_grid();
    let pass = render(&mut engine);
    assert!(pass.optimize);
    let left = pass.pane(Pane::Left).unwrap();
    assert_eq!(left.columns.len(), 1);
    assert_eq!(left.columns[0].position, 0);

    // The main pane keeps the fixed slots for geometry but hides them
    let main = pass.pane(Pane::Main).unwrap();
    let first = cell_at(&pass, Pane::Main, 0, 0).unwrap();
    assert!(main.columns[0].fixed_hidden);
    assert!(first.params.flags.fixed_hidden);
    assert_eq!(first.content, gridview::render::CellContent::Empty);
}

#[test]
fn test_span_callback_disables_optimize() {
    let mut engine = fixed_grid();
    engine.set_span_method(Some(Box::new(|_: &gridview::layout::SpanQuery<'_>| {
        None::<SpanHint>
    })));
    let pass = render(&mut engine);
    assert!(!pass.optimize);
    let left = pass.pane(Pane::Left).unwrap();
    assert_eq!(left.columns.len(), 5);
    assert_eq!(left.columns.iter().filter(|c| !c.fixed_hidden).count(), 1);
}

#[test]
fn test_no_overflow_shows_fixed_columns_in_main() {
    let mut cols = vec![fixed_column("l", FixedSide::Left)];
    cols.push(ColumnDescriptor::new("a").with_width(100.0));
    let mut engine = GridBuilder::new()
        .column_descriptors(cols)
        .rows(flat_records(3))
        .view(800.0, 480.0)
        .build();
    let pass = render(&mut engine);
    let main = pass.pane(Pane::Main).unwrap();
    assert!(main.columns.iter().all(|c| !c.fixed_hidden));
}
