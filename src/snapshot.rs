//! One-shot rendering of a complete grid description.
//!
//! Used by the CLI and the stateless wasm entry point: build an engine,
//! apply scroll and expansion, render once.

use serde::Deserialize;
use serde_json::Value;

use crate::config::GridConfig;
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::render::{CellStatusEntry, CellStatusMap, RenderPass};
use crate::types::{ColumnDescriptor, MergeSpan, RowId};
use crate::viewer::GridEngine;

/// Body area and scroll position
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewState {
    pub width: f32,
    pub height: f32,
    pub scroll_top: f32,
    pub scroll_left: f32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            scroll_top: 0.0,
            scroll_left: 0.0,
        }
    }
}

/// Everything needed to render one frame
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub config: GridConfig,
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Value>,
    pub footer: Vec<Value>,
    pub merges: Vec<MergeSpan>,
    pub footer_merges: Vec<MergeSpan>,
    /// Tree rows to expand, by identity
    pub expanded: Vec<String>,
    /// Rows whose detail slot is open, by identity
    pub details: Vec<String>,
    pub status: Vec<CellStatusEntry>,
    pub view: ViewState,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the snapshot. Returns the pass and every diagnostic raised.
    pub fn render(self) -> Result<(RenderPass, Vec<Diagnostic>)> {
        let mut engine = GridEngine::new(self.config)?;
        engine.resize(self.view.width, self.view.height);
        engine.load_columns(self.columns);
        engine.load_rows(self.rows);
        engine.set_footer_data(self.footer);
        engine.set_merge_spans(self.merges);
        engine.set_footer_merge_spans(self.footer_merges);
        for id in self.expanded.into_iter().map(RowId::new) {
            engine.set_row_expand(&id, true)?;
        }
        for id in self.details.into_iter().map(RowId::new) {
            engine.set_row_detail(&id, true)?;
        }
        engine.scroll_to(self.view.scroll_top, self.view.scroll_left);
        let status = CellStatusMap::from_entries(self.status);
        let pass = engine.render(&status);
        Ok((pass, engine.take_diagnostics()))
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
    use super::*;
    use crate::layout::Pane;

    #[test]
    fn test_snapshot_from_json() {
        let snapshot = Snapshot::from_json(
            r#"{
                "config": {"row": {"height": 20}},
                "columns": [{"field": "name", "width": 120}],
                "rows": [{"name": "a"}, {"name": "b"}, {"name": "c"}],
                "view": {"width": 400, "height": 40, "scrollTop": 20}
            }"#,
        )
        .unwrap();
        let (pass, diagnostics) = snapshot.render().unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(pass.scroll_top, 20.0);
        assert_eq!(pass.pane(Pane::Main).unwrap().rows.len(), 3);
    }
}
