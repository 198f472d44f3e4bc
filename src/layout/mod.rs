//! Layout engine: axis sizing, windowing and pane geometry.
//!
//! This module handles:
//! - Pre-computing item positions from row heights and column widths
//! - Deciding the materialized window of each axis
//! - Keeping the fixed panes scroll-synchronized with the main pane
//! - Merge span resolution

mod axis;
mod panes;
mod spans;
mod viewport;
mod window;

pub use axis::AxisSizing;
pub use panes::{
    is_optimize_mode, pane_columns, pane_widths, Pane, PaneColumn, PaneSync, ScrollUpdate,
    ScrollWrite,
};
pub use spans::{
    MergeTable, SpanMethod, SpanQuery, SpanResolver, LINEAR_SCAN_MAX_SPANS, MAX_INDEXED_CELLS,
};
pub use viewport::{PaneWidths, Viewport};
pub use window::{compute_window, WindowCalculator};
