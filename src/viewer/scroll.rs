//! Scroll-related logic for `GridEngine`.
//!
//! Includes viewport state, pane scroll synchronization and the window
//! recompute that every scroll schedules.

use crate::error::{GridError, Result};
use crate::layout::{pane_widths, Pane, ScrollUpdate, Viewport};
use crate::types::{ColumnId, RowId};

use super::GridEngine;

impl GridEngine {
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Resize the body area. Auto-width columns are refitted.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport.resize(width, height);
        if self.columns.fit_auto_widths(self.viewport.width) {
            self.rebuild_column_axes();
        }
        self.windows_stale = true;
        self.tasks.schedule_recompute();
    }

    /// Largest valid scroll offsets for the current content
    fn max_scroll(&mut self) -> (f32, f32) {
        self.ensure_structure();
        let widths = pane_widths(&self.columns);
        self.viewport.max_scroll(&widths, self.row_axis.total())
    }

    fn apply_scroll(&mut self, update: Option<ScrollUpdate>) -> Option<ScrollUpdate> {
        let update = update?;
        self.viewport.scroll_y = update.top;
        self.viewport.scroll_x = update.left;
        let ticket = self.tasks.schedule_recompute();
        tracing::trace!(
            target: "gridview",
            ticket,
            top = update.top,
            left = update.left,
            "scroll"
        );
        Some(update)
    }

    /// A native scroll event from one of the body panes.
    ///
    /// Returns the writes the host must apply to the other panes, or
    /// `None` for an echo of an earlier write.
    pub fn on_scroll(&mut self, pane: Pane, top: f32, left: f32) -> Option<ScrollUpdate> {
        let max = self.max_scroll();
        let update = self.pane_sync.on_scroll(pane, top, left, max);
        self.apply_scroll(update)
    }

    /// Wheel input over any pane
    pub fn on_wheel(&mut self, delta_x: f32, delta_y: f32) -> Option<ScrollUpdate> {
        let max = self.max_scroll();
        let update = self.pane_sync.on_wheel(delta_x, delta_y, max);
        self.apply_scroll(update)
    }

    /// Scroll every pane to an absolute position
    pub fn scroll_to(&mut self, top: f32, left: f32) -> Option<ScrollUpdate> {
        let max = self.max_scroll();
        let update = self.pane_sync.scroll_to(top, left, max);
        self.apply_scroll(update)
    }

    /// Scroll the least amount that brings a visible row fully into view
    pub fn scroll_to_row(&mut self, id: &RowId) -> Result<Option<ScrollUpdate>> {
        self.ensure_structure();
        let position = self
            .row_index
            .position_of(id)
            .ok_or_else(|| GridError::Other(format!("row {id} is not visible")))?;
        let y = self.row_axis.position(position);
        let bottom = y + self.row_axis.size(position);
        let top = self.viewport.scroll_y;
        let target = if y < top {
            y
        } else if bottom > top + self.viewport.height {
            bottom - self.viewport.height
        } else {
            return Ok(None);
        };
        Ok(self.scroll_to(target, self.viewport.scroll_x))
    }

    /// Scroll horizontally so a scrollable column is fully in view.
    /// Fixed columns are always in view.
    pub fn scroll_to_column(&mut self, id: &ColumnId) -> Result<Option<ScrollUpdate>> {
        let column = self
            .columns
            .by_id(id)
            .ok_or_else(|| GridError::Other(format!("unknown column {id}")))?;
        if column.is_fixed() {
            return Ok(None);
        }
        let index = column.order.saturating_sub(self.columns.center_range().start);
        let widths = pane_widths(&self.columns);
        let body = self.viewport.body_width(widths.left, widths.right);
        let x = self.center_axis.position(index);
        let right = x + self.center_axis.size(index);
        let left = self.viewport.scroll_x;
        let target = if x < left {
            x
        } else if right > left + body {
            right - body
        } else {
            return Ok(None);
        };
        Ok(self.scroll_to(self.viewport.scroll_y, target))
    }

    /// Recompute both windows for the current scroll position
    pub(super) fn recompute_windows(&mut self) {
        self.ensure_structure();
        let widths = pane_widths(&self.columns);
        let content_height = self.row_axis.total();
        self.pane_sync.set_panes(
            !self.columns.left_range().is_empty(),
            !self.columns.right_range().is_empty(),
        );

        // Content may have shrunk under the current position
        self.viewport.clamp_scroll(&widths, content_height);
        if (self.pane_sync.top() - self.viewport.scroll_y).abs() > f32::EPSILON
            || (self.pane_sync.left() - self.viewport.scroll_x).abs() > f32::EPSILON
        {
            self.pane_sync
                .reset(self.viewport.scroll_y, self.viewport.scroll_x);
        }

        let body_width = self.viewport.body_width(widths.left, widths.right);
        self.row_window = self.y_calc.compute(
            &self.row_axis,
            self.row_sizing_version,
            self.viewport.scroll_y,
            self.viewport.height,
        );
        self.column_window = self.x_calc.compute(
            &self.center_axis,
            self.column_sizing_version,
            self.viewport.scroll_x,
            body_width,
        );
        self.windows_stale = false;
    }

    /// Number of times either window's materialized range changed
    pub fn window_recomputes(&self) -> u64 {
        self.y_calc.recomputes() + self.x_calc.recomputes()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use crate::config::GridConfig;
    use crate::layout::Pane;
    use crate::types::ColumnDescriptor;
    use crate::viewer::GridEngine;
    use serde_json::json;

    fn engine(rows: usize) -> GridEngine {
        let mut config = GridConfig::default();
        config.row.height = Some(20.0);
        let mut engine = GridEngine::new(config).unwrap();
        engine.resize(300.0, 200.0);
        engine.load_columns(vec![ColumnDescriptor::new("n").with_width(100.0)]);
        engine.load_rows((0..rows).map(|i| json!({"n": i})).collect());
        engine
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut engine = engine(50);
        let update = engine.on_wheel(0.0, 10_000.0).unwrap();
        assert_eq!(update.top, 50.0 * 20.0 - 200.0);
        assert!(engine.on_wheel(0.0, 10.0).is_none());
    }

    #[test]
    fn test_repeated_scroll_is_noop() {
        let mut engine = engine(50);
        let update = engine.on_scroll(Pane::Main, 100.0, 0.0).unwrap();
        assert!(update.writes.is_empty());
        assert!(engine.on_scroll(Pane::Main, 100.0, 0.0).is_none());
    }

    #[test]
    fn test_scroll_to_row_minimal() {
        let mut engine = engine(50);
        let id = engine.flat_rows()[20].id().clone();
        let update = engine.scroll_to_row(&id).unwrap().unwrap();
        assert_eq!(update.top, 21.0 * 20.0 - 200.0);
        let first = engine.flat_rows()[15].id().clone();
        assert!(engine.scroll_to_row(&first).unwrap().is_none());
    }

    #[test]
    fn test_scroll_clamped_after_rows_removed() {
        let mut engine = engine(50);
        engine.on_wheel(0.0, 10_000.0);
        let ids: Vec<_> = engine.flat_rows()[5..].iter().map(|r| r.id().clone()).collect();
        engine.remove_rows(&ids);
        engine.flush();
        assert_eq!(engine.viewport().scroll_y, 0.0);
    }
}
