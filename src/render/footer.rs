//! Footer composition.
//!
//! Footer rows are host-supplied records keyed by column field. They are
//! never windowed vertically, follow the body's horizontal window and
//! carry their own merge list / span callback.

use serde_json::Value;

use crate::layout::{Pane, PaneColumn, SpanQuery};
use crate::types::{Align, OverflowMode};

use super::cell::{CellComposer, CellFlags, CellParams, RenderedCell};
use super::registry::CellContent;

impl CellComposer<'_> {
    /// Height of every footer row
    pub fn footer_row_height(&self) -> f32 {
        self.config
            .row
            .height
            .unwrap_or(self.config.row.default_height)
    }

    /// Compose one footer cell; `None` when a footer span suppresses it.
    ///
    /// Alignment falls back footer setting, table footer default, column
    /// alignment, table default. Horizontal windowing cannot measure
    /// wrapped footers, so it forces ellipsis.
    pub fn footer_cell(
        &self,
        index: usize,
        record: &Value,
        pane: Pane,
        slot: PaneColumn,
        last_column: bool,
    ) -> Option<RenderedCell> {
        let column = self.columns.get(slot.position)?;
        let span = self.footer_spans.resolve(&SpanQuery {
            row: index,
            col: slot.position,
            row_id: None,
            column,
            record,
        });
        let (rowspan, colspan) = span.extent()?;
        let height = self.footer_row_height();

        let align: Align = column
            .footer_align
            .or(self.config.cell.footer_align)
            .or(column.align)
            .or(self.config.cell.align)
            .unwrap_or_default();
        let mut overflow = column
            .footer_overflow
            .or(self.config.cell.footer_overflow)
            .unwrap_or_default();
        if self.x_windowed && !overflow.is_clipped() {
            overflow = OverflowMode::Ellipsis;
        }

        let placeholder = self.column_outside_window(column);
        let fixed_hidden = slot.fixed_hidden && colspan <= 1 && rowspan <= 1;
        let params = CellParams {
            row_id: None,
            column_id: column.id.clone(),
            field: column.field.clone(),
            row: index,
            data_index: None,
            col: slot.position,
            pane,
            x: self.col_axis.position(slot.position),
            y: height * index as f32,
            width: self.col_axis.span_size(slot.position, colspan as usize),
            height: height * rowspan as f32,
            rowspan,
            colspan,
            align,
            vertical_align: column
                .vertical_align
                .or(self.config.cell.vertical_align)
                .unwrap_or_default(),
            overflow,
            level: 0,
            indent: 0.0,
            seq: None,
            error: None,
            flags: CellFlags {
                fixed_hidden,
                placeholder,
                last_column,
                current_column: self.current_column == Some(&column.id),
                ..CellFlags::default()
            },
        };
        let content = if placeholder || fixed_hidden {
            CellContent::Empty
        } else {
            self.registry
                .get(column.renderer.as_deref())
                .render_footer(&params, record)
        };
        Some(RenderedCell { params, content })
    }
}
