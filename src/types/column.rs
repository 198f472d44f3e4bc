use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable column identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(String);

impl ColumnId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Which frozen pane a column belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FixedSide {
    #[default]
    None,
    Left,
    Right,
}

/// Horizontal alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerticalAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

/// How cell content that does not fit is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverflowMode {
    Ellipsis,
    Title,
    Tooltip,
    /// Content wraps; row height grows (auto-height)
    #[default]
    None,
}

impl OverflowMode {
    /// Whether the cell clips to a single line
    pub fn is_clipped(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Column configuration as supplied by the host. Group columns carry
/// `children`; leaves are everything without children.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnDescriptor {
    /// Explicit identity; derived from `field` (or position) when absent
    pub id: Option<ColumnId>,
    pub field: Option<String>,
    pub title: Option<String>,
    pub fixed: FixedSide,
    /// Width in pixels; `None` takes the configured default
    pub width: Option<f32>,
    pub min_width: Option<f32>,
    /// Auto width: the column absorbs remaining space (min width applies)
    pub auto_width: bool,
    pub resizable: Option<bool>,
    /// Name in the renderer registry
    pub renderer: Option<String>,
    pub align: Option<Align>,
    pub vertical_align: Option<VerticalAlign>,
    pub overflow: Option<OverflowMode>,
    pub footer_align: Option<Align>,
    pub footer_overflow: Option<OverflowMode>,
    /// Column that shows tree indentation and expand toggles
    pub tree_node: bool,
    /// Cells of this column start a row drag (cell trigger mode)
    pub drag_sort: bool,
    /// Marks the detail-row expand column
    pub expand: bool,
    pub children: Vec<ColumnDescriptor>,
}

impl ColumnDescriptor {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::default()
        }
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_fixed(mut self, fixed: FixedSide) -> Self {
        self.fixed = fixed;
        self
    }

    pub fn with_renderer(mut self, name: impl Into<String>) -> Self {
        self.renderer = Some(name.into());
        self
    }

    pub fn with_children(mut self, children: Vec<ColumnDescriptor>) -> Self {
        self.children = children;
        self
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Resolved leaf column metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMeta {
    pub id: ColumnId,
    pub field: Option<String>,
    pub title: Option<String>,
    pub fixed: FixedSide,
    /// Position in the display-ordered leaf sequence
    pub order: usize,
    /// Resolved width in pixels
    pub width: f32,
    pub min_width: f32,
    pub is_auto: bool,
    pub resizable: bool,
    /// Group header this leaf sits under
    pub parent: Option<ColumnId>,
    pub renderer: Option<String>,
    pub align: Option<Align>,
    pub vertical_align: Option<VerticalAlign>,
    pub overflow: Option<OverflowMode>,
    pub footer_align: Option<Align>,
    pub footer_overflow: Option<OverflowMode>,
    pub tree_node: bool,
    pub drag_sort: bool,
    pub expand: bool,
}

impl ColumnMeta {
    pub fn is_fixed(&self) -> bool {
        self.fixed != FixedSide::None
    }
}
