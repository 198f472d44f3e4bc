//! Drag-reorder handlers for `GridEngine`.
//!
//! The dataset is only touched when a drag ends on a legal target. While
//! the drag is in flight the render pass splices the dragged item into
//! the materialized window instead.

use std::ops::Range;

use crate::config::DragTrigger;
use crate::drag::{self, DragItem, DragState, DropTarget};
use crate::error::{GridError, Result};
use crate::layout::PaneColumn;
use crate::types::{ColumnId, FixedSide, RowId};

use super::{offset_range, GridEngine};

impl GridEngine {
    /// Pick up a row
    pub fn drag_start_row(&mut self, id: &RowId, pointer: (f32, f32)) -> Result<()> {
        let config = &self.config.row_drag;
        if !config.enabled {
            return Err(GridError::DragRejected("row dragging is disabled".to_string()));
        }
        if config.trigger == DragTrigger::Cell && !self.columns.leaves().iter().any(|c| c.drag_sort)
        {
            return Err(GridError::DragRejected(
                "no column carries the drag handle".to_string(),
            ));
        }
        let nested_allowed = config.peer_only || config.cross_level;
        self.ensure_structure();
        let origin = self
            .row_index
            .position_of(id)
            .ok_or_else(|| GridError::DragRejected(format!("row {id} is not visible")))?;
        let depth = self.flat.get(origin).map_or(0, |row| row.depth());
        if depth > 0 && !nested_allowed {
            return Err(GridError::DragRejected(
                "only top-level rows can be reordered".to_string(),
            ));
        }
        self.drag.start(DragItem::Row(id.clone()), origin, pointer)
    }

    /// Pick up a leaf column
    pub fn drag_start_column(&mut self, id: &ColumnId, pointer: (f32, f32)) -> Result<()> {
        if !self.config.column_drag.enabled {
            return Err(GridError::DragRejected(
                "column dragging is disabled".to_string(),
            ));
        }
        let origin = self
            .columns
            .position_of(id)
            .ok_or_else(|| GridError::DragRejected(format!("unknown column {id}")))?;
        self.drag.start(DragItem::Column(id.clone()), origin, pointer)
    }

    /// Pointer moved over the row (flat position) or leaf column at
    /// `hover`. Targets outside the materialized window are clamped to it.
    pub fn drag_move(&mut self, pointer: (f32, f32), hover: usize) -> Option<DropTarget> {
        let window = self.drag_window(&self.drag.state()?.item);
        self.drag.move_to(pointer, hover, &window)
    }

    fn drag_window(&self, item: &DragItem) -> Range<usize> {
        match item {
            DragItem::Row(_) => self.row_window.materialized(),
            DragItem::Column(id) => match self.columns.by_id(id).map(|c| c.fixed) {
                Some(FixedSide::Left) => self.columns.left_range(),
                Some(FixedSide::Right) => self.columns.right_range(),
                _ => {
                    let center = self.columns.center_range();
                    offset_range(&self.column_window.materialized(), center.start, &center)
                }
            },
        }
    }

    /// Drop the dragged item on its current target.
    ///
    /// Returns `Ok(true)` when the dataset changed and `Ok(false)` when the
    /// item was dropped in place. An illegal target rejects the drop and
    /// leaves the dataset as it was.
    pub fn drag_end(&mut self) -> Result<bool> {
        let Some(state) = self.drag.finish() else {
            return Ok(false);
        };
        let Some(target) = state.target else {
            return Ok(false);
        };
        let result = match &state.item {
            DragItem::Row(id) => self.drop_row(id, target),
            DragItem::Column(id) => self.drop_column(id, target),
        };
        match &result {
            Ok(changed) => {
                tracing::debug!(target: "gridview", item = ?state.item, changed, "drag dropped");
            }
            Err(e) => {
                tracing::debug!(target: "gridview", item = ?state.item, error = %e, "drop rejected");
            }
        }
        result
    }

    fn drop_row(&mut self, id: &RowId, target: DropTarget) -> Result<bool> {
        self.ensure_structure();
        let target_id = self
            .flat
            .get(target.position)
            .map(|row| row.id().clone())
            .ok_or_else(|| GridError::DragRejected("drop target vanished".to_string()))?;
        if &target_id == id {
            return Ok(false);
        }
        drag::apply_row_drop(
            &mut self.nodes,
            &self.config.row_drag,
            id,
            &target_id,
            target.side,
        )?;
        self.mark_structure_changed();
        Ok(true)
    }

    fn drop_column(&mut self, id: &ColumnId, target: DropTarget) -> Result<bool> {
        let vanished = || GridError::DragRejected("column no longer exists".to_string());
        let from = self.columns.by_id(id).ok_or_else(vanished)?;
        let to = self.columns.get(target.position).ok_or_else(vanished)?;
        if from.id == to.id {
            return Ok(false);
        }
        let same_side = from.fixed == to.fixed;
        let from_path = self.columns.descriptor_path(&from.id).ok_or_else(vanished)?.to_vec();
        let to_path = self.columns.descriptor_path(&to.id).ok_or_else(vanished)?.to_vec();
        drag::check_column_drop(&self.config.column_drag, &from_path, &to_path, same_side)?;
        drag::apply_column_drop(&mut self.descriptors, &from_path, &to_path, target.side)?;
        self.rebuild_columns();
        Ok(true)
    }

    /// Abandon the drag; nothing was changed
    pub fn drag_cancel(&mut self) -> bool {
        self.drag.cancel().is_some()
    }

    pub fn drag_state(&self) -> Option<&DragState> {
        self.drag.state()
    }

    /// Cancel a drag whose item disappeared in a mutation
    pub(super) fn cancel_vanished_drag(&mut self) {
        let vanished = match self.drag.state().map(|s| &s.item) {
            Some(DragItem::Row(id)) => !self.paths.contains_key(id),
            Some(DragItem::Column(id)) => self.columns.by_id(id).is_none(),
            None => false,
        };
        if vanished {
            self.drag.cancel();
            tracing::debug!(target: "gridview", "dragged item vanished, drag cancelled");
        }
    }

    /// Main-pane column slots with the dragged scrollable column spliced
    /// into the materialized range `cols`
    pub(super) fn splice_dragged_column(
        &self,
        slots: &mut Vec<PaneColumn>,
        id: &ColumnId,
        cols: &Range<usize>,
    ) {
        let center = self.columns.center_range();
        let Some(position) = self.columns.position_of(id).filter(|p| center.contains(p)) else {
            return;
        };
        let order = self.drag.splice_window(cols.clone(), position);
        let mut spliced = Vec::with_capacity(slots.len() + 1);
        spliced.extend(slots.iter().filter(|s| s.position < center.start).copied());
        spliced.extend(order.into_iter().map(|position| PaneColumn {
            position,
            fixed_hidden: false,
        }));
        spliced.extend(slots.iter().filter(|s| s.position >= center.end).copied());
        *slots = spliced;
    }
}
