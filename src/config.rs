//! Engine configuration.
//!
//! Every option has a default so a host can deserialize a partial JSON
//! object. Each option group is consumed by exactly one component:
//!
//! | group | consumer |
//! |---|---|
//! | `row`, `column` | identity index, axis sizing |
//! | `virtualY`, `virtualX` | window calculator |
//! | `tree`, `expand` | flattener |
//! | `rowDrag`, `columnDrag` | drag splicer |
//! | `span` | span resolver |
//! | `cell` | cell composition |

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::{GridError, Result};
use crate::types::{Align, OverflowMode, VerticalAlign};

/// Default row height in pixels
pub const DEFAULT_ROW_HEIGHT: f32 = 36.0;

/// Default column width in pixels
pub const DEFAULT_COL_WIDTH: f32 = 100.0;

/// Default minimum column width in pixels
pub const DEFAULT_MIN_COL_WIDTH: f32 = 40.0;

/// Default number of items preloaded on each side of the visible range
pub const DEFAULT_PRELOAD: usize = 5;

/// Top-level configuration for a [`crate::viewer::GridEngine`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    pub row: RowConfig,
    pub column: ColumnConfig,
    pub virtual_y: VirtualAxisConfig,
    pub virtual_x: VirtualAxisConfig,
    /// Tree mode is enabled when present
    pub tree: Option<TreeConfig>,
    pub expand: ExpandConfig,
    pub row_drag: DragConfig,
    pub column_drag: DragConfig,
    pub span: SpanConfig,
    pub cell: CellConfig,
    /// Zebra striping of data rows
    pub stripe: bool,
}

/// Row identity and sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowConfig {
    /// Record fields forming the row identity. Empty means engine surrogates.
    pub key_fields: Vec<String>,
    /// Fixed height for every row. `None` enables auto (measured) heights.
    pub height: Option<f32>,
    /// Estimate used for unmeasured rows in auto-height mode
    pub default_height: f32,
}

impl Default for RowConfig {
    fn default() -> Self {
        Self {
            key_fields: Vec::new(),
            height: None,
            default_height: DEFAULT_ROW_HEIGHT,
        }
    }
}

/// Column sizing defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnConfig {
    pub default_width: f32,
    pub min_width: f32,
    pub resizable: bool,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            default_width: DEFAULT_COL_WIDTH,
            min_width: DEFAULT_MIN_COL_WIDTH,
            resizable: false,
        }
    }
}

/// Windowing options for one axis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualAxisConfig {
    /// `Some(true)` always windows, `Some(false)` never does, `None` decides
    /// from the axis extent.
    pub enabled: Option<bool>,
    /// Items materialized beyond each edge of the visible range
    pub preload: usize,
    /// Auto mode windows when `extent > viewport * capacity_factor`
    pub capacity_factor: f32,
    /// Auto mode never windows axes with at most this many items
    pub min_items: usize,
    /// Scroll deltas below this many pixels reuse the cached window
    pub scroll_threshold_px: f32,
}

impl Default for VirtualAxisConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            preload: DEFAULT_PRELOAD,
            capacity_factor: 1.0,
            min_items: 0,
            scroll_threshold_px: 0.0,
        }
    }
}

/// How the sequence number column is computed in tree mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeqMode {
    /// Dotted path (`1`, `1.1`, `1.2`, `2`); the first component is the
    /// original top-level ordinal, so numbers survive expand/collapse.
    #[default]
    Default,
    /// Purely positional `1..n` over the data rows, recomputed every flatten
    Increasing,
}

/// Tree mode options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeConfig {
    /// Record field holding the child records
    pub children_field: String,
    /// Indent per level in pixels (tree node column)
    pub indent: f32,
    pub seq_mode: SeqMode,
    pub expand_all: bool,
    /// Identities expanded on load
    pub expand_row_keys: Vec<String>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            children_field: "children".to_string(),
            indent: 20.0,
            seq_mode: SeqMode::Default,
            expand_all: false,
            expand_row_keys: Vec::new(),
        }
    }
}

/// Detail-row expansion options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpandConfig {
    pub enabled: bool,
    /// Height of the synthetic detail slot; falls back to the default row height
    pub detail_height: Option<f32>,
    pub expand_all: bool,
    pub expand_row_keys: Vec<String>,
}

/// What the user grabs to start a row drag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DragTrigger {
    /// Only cells of columns with `dragSort` start a drag
    #[default]
    Cell,
    /// Any cell of the row starts a drag
    Row,
}

/// Drag options for one axis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DragConfig {
    pub enabled: bool,
    pub trigger: DragTrigger,
    /// Items may move only among siblings (same parent), at any depth
    pub peer_only: bool,
    /// Items may move to a different parent / group
    pub cross_level: bool,
}

/// Which span source wins when both a merge table and a callback exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpanPrecedence {
    #[default]
    Table,
    Callback,
}

/// Span resolution options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpanConfig {
    pub precedence: SpanPrecedence,
}

/// Table-wide cell defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellConfig {
    pub align: Option<Align>,
    pub vertical_align: Option<VerticalAlign>,
    pub overflow: Option<OverflowMode>,
    pub footer_align: Option<Align>,
    pub footer_overflow: Option<OverflowMode>,
}

impl GridConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Fixed row height if configured, else `None` (auto height).
    pub fn fixed_row_height(&self) -> Option<f32> {
        self.row.height
    }

    /// Height of a detail slot.
    pub fn detail_height(&self) -> f32 {
        self.expand
            .detail_height
            .or(self.row.height)
            .unwrap_or(self.row.default_height)
    }

    /// Check the configuration.
    ///
    /// Impossible sizes are surfaced as `Err`. Soft conflicts are reported
    /// through `diag` and the conflicting feature is switched off.
    pub fn validate(&mut self, diag: &mut Diagnostics) -> Result<()> {
        check_size("row.defaultHeight", self.row.default_height)?;
        if let Some(h) = self.row.height {
            check_size("row.height", h)?;
        }
        check_size("column.defaultWidth", self.column.default_width)?;
        if !self.column.min_width.is_finite() || self.column.min_width < 0.0 {
            return Err(GridError::Configuration(format!(
                "column.minWidth must be a finite non-negative number, got {}",
                self.column.min_width
            )));
        }
        if let Some(h) = self.expand.detail_height {
            check_size("expand.detailHeight", h)?;
        }
        for (name, axis) in [("virtualY", &self.virtual_y), ("virtualX", &self.virtual_x)] {
            if !axis.capacity_factor.is_finite() || axis.capacity_factor <= 0.0 {
                return Err(GridError::Configuration(format!(
                    "{name}.capacityFactor must be positive"
                )));
            }
        }

        for (name, drag) in [
            ("rowDrag", &mut self.row_drag),
            ("columnDrag", &mut self.column_drag),
        ] {
            if drag.peer_only && drag.cross_level {
                diag.report(
                    format!("{name}-conflict"),
                    &GridError::Configuration(format!(
                        "{name}: peerOnly and crossLevel are mutually exclusive; crossLevel disabled"
                    )),
                );
                drag.cross_level = false;
            }
        }
        Ok(())
    }
}

fn check_size(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GridError::Configuration(format!(
            "{name} must be a positive number, got {value}"
        )))
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

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GridConfig::from_json(r#"{"row": {"height": 24}, "virtualY": {"preload": 3}}"#)
            .unwrap();
        assert_eq!(config.row.height, Some(24.0));
        assert_eq!(config.row.default_height, DEFAULT_ROW_HEIGHT);
        assert_eq!(config.virtual_y.preload, 3);
        assert_eq!(config.virtual_x.preload, DEFAULT_PRELOAD);
        assert!(config.tree.is_none());
    }

    #[test]
    fn test_tree_config_defaults() {
        let config = GridConfig::from_json(r#"{"tree": {}}"#).unwrap();
        let tree = config.tree.unwrap();
        assert_eq!(tree.children_field, "children");
        assert_eq!(tree.seq_mode, SeqMode::Default);
    }

    #[test]
    fn test_validate_rejects_zero_height() {
        let mut config = GridConfig::default();
        config.row.height = Some(0.0);
        let mut diag = Diagnostics::new();
        assert!(matches!(
            config.validate(&mut diag),
            Err(GridError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_disables_conflicting_drag() {
        let mut config = GridConfig::default();
        config.row_drag.enabled = true;
        config.row_drag.peer_only = true;
        config.row_drag.cross_level = true;
        let mut diag = Diagnostics::new();
        config.validate(&mut diag).unwrap();
        assert!(!config.row_drag.cross_level);
        assert!(config.row_drag.peer_only);
        assert!(diag.has_reported("rowDrag-conflict"));
    }

    #[test]
    fn test_detail_height_fallbacks() {
        let mut config = GridConfig::default();
        assert_eq!(config.detail_height(), DEFAULT_ROW_HEIGHT);
        config.row.height = Some(30.0);
        assert_eq!(config.detail_height(), 30.0);
        config.expand.detail_height = Some(120.0);
        assert_eq!(config.detail_height(), 120.0);
    }
}
