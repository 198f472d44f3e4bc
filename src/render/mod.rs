//! Cell composition and the render-pass output.
//!
//! This module provides:
//! - The per-cell parameter record and its composition
//! - The name-keyed renderer registry
//! - The read-only validation status contract
//! - Footer composition

pub mod cell;
pub mod footer;
pub mod registry;
pub mod validation;

pub use cell::{CellComposer, CellFlags, CellParams, RenderedCell};
pub use registry::{
    value_text, CellContent, CellRenderer, DefaultTextRenderer, RendererRegistry, SeqRenderer,
    DEFAULT_RENDERER, SEQ_RENDERER,
};
pub use validation::{CellStatusEntry, CellStatusMap, CellStatusSource, ValidationError};

use serde::Serialize;

use crate::layout::{Pane, PaneColumn, PaneWidths};
use crate::types::{RowId, WindowState};

/// One rendered row of one pane
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedRow {
    /// Row identity (the owner's for a detail slot)
    pub id: RowId,
    pub flat_position: usize,
    pub y: f32,
    pub height: f32,
    pub detail: bool,
    pub cells: Vec<RenderedCell>,
}

/// Rows and columns of one pane
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaneRender {
    pub pane: Pane,
    pub columns: Vec<PaneColumn>,
    pub rows: Vec<RenderedRow>,
    /// Footer rows of this pane
    pub footer: Vec<Vec<RenderedCell>>,
}

/// Output of one render pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPass {
    /// Structure version the pass was built from
    pub version: u64,
    pub row_window: WindowState,
    /// Window over the scrollable columns
    pub column_window: WindowState,
    pub widths: PaneWidths,
    pub content_height: f32,
    pub scroll_top: f32,
    pub scroll_left: f32,
    pub optimize: bool,
    pub panes: Vec<PaneRender>,
}

impl RenderPass {
    pub fn pane(&self, pane: Pane) -> Option<&PaneRender> {
        self.panes.iter().find(|p| p.pane == pane)
    }

    /// Total rendered (non-suppressed) body cells across panes
    pub fn cell_count(&self, pane: Pane) -> usize {
        self.pane(pane)
            .map_or(0, |p| p.rows.iter().map(|r| r.cells.len()).sum())
    }
}

/// Whether every pane lists the same rows with identical geometry
pub fn rows_aligned(panes: &[PaneRender]) -> bool {
    let Some((first, rest)) = panes.split_first() else {
        return true;
    };
    rest.iter().all(|pane| {
        pane.rows.len() == first.rows.len()
            && pane.rows.iter().zip(&first.rows).all(|(a, b)| {
                a.id == b.id
                    && a.detail == b.detail
                    && a.y.to_bits() == b.y.to_bits()
                    && a.height.to_bits() == b.height.to_bits()
            })
    })
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
    use super::*;

    fn row(id: &str, y: f32, height: f32) -> RenderedRow {
        RenderedRow {
            id: RowId::new(id),
            flat_position: 0,
            y,
            height,
            detail: false,
            cells: Vec::new(),
        }
    }

    fn pane(pane: Pane, rows: Vec<RenderedRow>) -> PaneRender {
        PaneRender {
            pane,
            columns: Vec::new(),
            rows,
            footer: Vec::new(),
        }
    }

    #[test]
    fn test_rows_aligned() {
        let a = pane(Pane::Main, vec![row("a", 0.0, 24.0), row("b", 24.0, 24.0)]);
        let b = pane(Pane::Left, vec![row("a", 0.0, 24.0), row("b", 24.0, 24.0)]);
        assert!(rows_aligned(&[a.clone(), b]));
        let c = pane(Pane::Right, vec![row("a", 0.0, 24.0), row("b", 24.0, 30.0)]);
        assert!(!rows_aligned(&[a, c]));
        assert!(rows_aligned(&[]));
    }
}
