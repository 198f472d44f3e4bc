//! Cell composition.
//!
//! Assembles the complete parameter record for every rendered cell and
//! delegates content to the column's renderer. All inputs are borrowed
//! read-only for the duration of one render pass.

use std::ops::Range;

use serde::Serialize;
use serde_json::Value;

use crate::config::{DragTrigger, GridConfig};
use crate::drag::DragItem;
use crate::index::ColumnIndex;
use crate::layout::{AxisSizing, Pane, PaneColumn, SpanQuery, SpanResolver};
use crate::types::{
    Align, ColumnId, ColumnMeta, OverflowMode, RowId, RowMeta, Seq, SpanState, VerticalAlign,
};

use super::registry::{CellContent, RendererRegistry};
use super::validation::{CellStatusSource, ValidationError};

/// Boolean state of a cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellFlags {
    /// Geometry kept, content shown by another pane
    pub fixed_hidden: bool,
    /// Outside the materialized range: geometry kept, content suppressed
    pub placeholder: bool,
    pub invalid: bool,
    pub dirty: bool,
    pub last_column: bool,
    pub tree_node: bool,
    pub expanded: bool,
    pub has_children: bool,
    /// Pressing this cell starts a row drag
    pub drag_handle: bool,
    /// Row or column currently being dragged
    pub dragging: bool,
    pub stripe: bool,
    pub current_row: bool,
    pub current_column: bool,
    /// Synthetic detail-row cell
    pub detail: bool,
}

/// Everything a renderer gets to know about one cell
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellParams {
    /// `None` for footer cells
    pub row_id: Option<RowId>,
    pub column_id: ColumnId,
    pub field: Option<String>,
    /// Flat row position, or footer row index
    pub row: usize,
    /// Position among data rows
    pub data_index: Option<usize>,
    /// Leaf column position
    pub col: usize,
    pub pane: Pane,
    /// Offset from the left edge of the full column strip
    pub x: f32,
    /// Content offset from the top of the body (or footer)
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rowspan: u32,
    pub colspan: u32,
    pub align: Align,
    pub vertical_align: VerticalAlign,
    pub overflow: OverflowMode,
    /// Tree depth
    pub level: usize,
    /// Tree-node indent in pixels
    pub indent: f32,
    pub seq: Option<Seq>,
    pub error: Option<ValidationError>,
    pub flags: CellFlags,
}

/// A composed cell with its content
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedCell {
    #[serde(flatten)]
    pub params: CellParams,
    pub content: CellContent,
}

/// Read-only inputs of one composition pass
pub struct CellComposer<'a> {
    pub config: &'a GridConfig,
    pub columns: &'a ColumnIndex,
    /// Widths of all leaves in display order
    pub col_axis: &'a AxisSizing,
    /// Heights of the flattened rows
    pub row_axis: &'a AxisSizing,
    pub spans: &'a SpanResolver,
    pub footer_spans: &'a SpanResolver,
    pub status: &'a dyn CellStatusSource,
    pub registry: &'a RendererRegistry,
    /// Materialized flat row positions
    pub rows_window: Range<usize>,
    /// Materialized leaf positions of the scrollable strip
    pub cols_window: Range<usize>,
    /// Horizontal windowing active
    pub x_windowed: bool,
    pub current_row: Option<&'a RowId>,
    pub current_column: Option<&'a ColumnId>,
    pub dragging: Option<&'a DragItem>,
}

impl CellComposer<'_> {
    /// Scrollable column outside the horizontal window
    pub(crate) fn column_outside_window(&self, column: &ColumnMeta) -> bool {
        !column.is_fixed() && !self.cols_window.contains(&column.order)
    }

    fn body_align(&self, column: &ColumnMeta) -> Align {
        column
            .align
            .or_else(|| self.registry.get(column.renderer.as_deref()).default_align())
            .or(self.config.cell.align)
            .unwrap_or_default()
    }

    /// Compose one body cell; `None` when a span suppresses it.
    pub fn body_cell(
        &self,
        meta: &RowMeta,
        record: &Value,
        pane: Pane,
        slot: PaneColumn,
        last_column: bool,
    ) -> Option<RenderedCell> {
        let column = self.columns.get(slot.position)?;
        let span = self.spans.resolve(&SpanQuery {
            row: meta.flat_position,
            col: slot.position,
            row_id: Some(&meta.id),
            column,
            record,
        });
        let (rowspan, colspan) = span.extent()?;
        // A hidden slot carrying a span must render, or the span is lost
        let fixed_hidden = slot.fixed_hidden && matches!(span, SpanState::Plain);
        let placeholder = !self.rows_window.contains(&meta.flat_position)
            || self.column_outside_window(column);

        let tree = self.config.tree.as_ref().filter(|_| column.tree_node);
        let row_drag = &self.config.row_drag;
        let error = self.status.error(&meta.id, &column.id).cloned();

        let params = CellParams {
            row_id: Some(meta.id.clone()),
            column_id: column.id.clone(),
            field: column.field.clone(),
            row: meta.flat_position,
            data_index: Some(meta.data_index),
            col: slot.position,
            pane,
            x: self.col_axis.position(slot.position),
            y: self.row_axis.position(meta.flat_position),
            width: self.col_axis.span_size(slot.position, colspan as usize),
            height: self.row_axis.span_size(meta.flat_position, rowspan as usize),
            rowspan,
            colspan,
            align: self.body_align(column),
            vertical_align: column
                .vertical_align
                .or(self.config.cell.vertical_align)
                .unwrap_or_default(),
            overflow: column
                .overflow
                .or(self.config.cell.overflow)
                .unwrap_or_default(),
            level: meta.depth,
            indent: tree.map_or(0.0, |t| t.indent * meta.depth as f32),
            seq: Some(meta.seq.clone()),
            flags: CellFlags {
                fixed_hidden,
                placeholder,
                invalid: error.is_some(),
                dirty: self.status.is_dirty(&meta.id, &column.id),
                last_column,
                tree_node: tree.is_some(),
                expanded: tree.is_some() && meta.is_expanded,
                has_children: tree.is_some() && meta.has_children,
                drag_handle: row_drag.enabled
                    && (row_drag.trigger == DragTrigger::Row || column.drag_sort),
                dragging: match self.dragging {
                    Some(DragItem::Row(id)) => *id == meta.id,
                    Some(DragItem::Column(id)) => *id == column.id,
                    None => false,
                },
                stripe: self.config.stripe && meta.data_index % 2 == 1,
                current_row: self.current_row == Some(&meta.id),
                current_column: self.current_column == Some(&column.id),
                detail: false,
            },
            error,
        };

        let content = if params.flags.placeholder || params.flags.fixed_hidden {
            CellContent::Empty
        } else {
            self.registry
                .get(column.renderer.as_deref())
                .render_cell(&params, record)
        };
        Some(RenderedCell { params, content })
    }

    /// Compose the single cell of a detail slot, spanning every column of
    /// the pane. Content comes from the expand column's renderer and is
    /// only shown in the main pane.
    pub fn detail_cell(
        &self,
        owner: &RowMeta,
        record: &Value,
        flat_position: usize,
        pane: Pane,
        slots: &[PaneColumn],
    ) -> Option<RenderedCell> {
        let first = slots.first()?;
        let column = self
            .columns
            .leaves()
            .iter()
            .find(|c| c.expand)
            .or_else(|| self.columns.get(first.position))?;
        let width: f32 = slots
            .iter()
            .map(|s| self.col_axis.size(s.position))
            .sum();
        let colspan = u32::try_from(slots.len()).unwrap_or(u32::MAX);
        let placeholder = !self.rows_window.contains(&flat_position);

        let params = CellParams {
            row_id: Some(owner.id.clone()),
            column_id: column.id.clone(),
            field: column.field.clone(),
            row: flat_position,
            data_index: None,
            col: first.position,
            pane,
            x: self.col_axis.position(first.position),
            y: self.row_axis.position(flat_position),
            width,
            height: self.row_axis.size(flat_position),
            rowspan: 1,
            colspan,
            align: self.body_align(column),
            vertical_align: column
                .vertical_align
                .or(self.config.cell.vertical_align)
                .unwrap_or_default(),
            overflow: OverflowMode::None,
            level: owner.depth,
            indent: 0.0,
            seq: Some(owner.seq.clone()),
            error: None,
            flags: CellFlags {
                fixed_hidden: pane != Pane::Main,
                placeholder,
                last_column: true,
                detail: true,
                ..CellFlags::default()
            },
        };
        let content = if params.flags.placeholder || params.flags.fixed_hidden {
            CellContent::Empty
        } else {
            self.registry
                .get(column.renderer.as_deref())
                .render_cell(&params, record)
        };
        Some(RenderedCell { params, content })
    }
}
