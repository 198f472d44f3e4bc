//! Common assertion helpers over render passes and flattened rows.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use gridview::layout::Pane;
use gridview::render::{CellStatusMap, RenderPass, RenderedCell};
use gridview::{FlatRow, GridEngine};

// Re-export fixtures for convenience
pub use super::fixtures::*;

// ============================================================================
// Render Helpers
// ============================================================================

/// Render with an empty status snapshot
pub fn render(engine: &mut GridEngine) -> RenderPass {
    engine.render(&CellStatusMap::new())
}

/// Identities of the flattened rows, in order
pub fn flat_ids(engine: &mut GridEngine) -> Vec<String> {
    engine
        .flat_rows()
        .iter()
        .map(|row| match row {
            FlatRow::Data(meta) => meta.id.as_str().to_string(),
            FlatRow::Detail { owner, .. } => format!("{owner}:detail"),
        })
        .collect()
}

/// Cell at flat `(row, col)` in `pane`, if rendered
pub fn cell_at(pass: &RenderPass, pane: Pane, row: usize, col: usize) -> Option<&RenderedCell> {
    pass.pane(pane)?
        .rows
        .iter()
        .find(|r| r.flat_position == row)?
        .cells
        .iter()
        .find(|c| c.params.col == col)
}

/// Row identities of a pane, in render order
pub fn pane_row_ids(pass: &RenderPass, pane: Pane) -> Vec<String> {
    pass.pane(pane)
        .map(|p| p.rows.iter().map(|r| r.id.as_str().to_string()).collect())
        .unwrap_or_default()
}

// ============================================================================
// Assertions
// ============================================================================

/// Assert a cell renders with the given spans
pub fn assert_span(pass: &RenderPass, row: usize, col: usize, rowspan: u32, colspan: u32) {
    let cell = cell_at(pass, Pane::Main, row, col)
        .unwrap_or_else(|| panic!("cell ({row},{col}) was not rendered"));
    assert_eq!(
        (cell.params.rowspan, cell.params.colspan),
        (rowspan, colspan),
        "span of cell ({row},{col})"
    );
}

/// Assert a cell is suppressed by a span
pub fn assert_suppressed(pass: &RenderPass, row: usize, col: usize) {
    assert!(
        cell_at(pass, Pane::Main, row, col).is_none(),
        "cell ({row},{col}) should be suppressed"
    );
}

/// Assert the materialized row window is `start..end`
pub fn assert_row_window(engine: &GridEngine, start: usize, end: usize) {
    let window = engine.row_window();
    assert_eq!(
        (window.start, window.end),
        (start, end),
        "row window {window:?}"
    );
}
