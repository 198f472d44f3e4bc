use serde::{Deserialize, Deserializer, Serialize};

fn unit_extent() -> u32 {
    1
}

/// Extents arrive as signed numbers from hosts. Anything `<= 0` becomes 0
/// (suppressed); a missing or null extent is 1.
fn extent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Option::<i64>::deserialize(deserializer)?;
    Ok(value.map_or(1, |v| u32::try_from(v.max(0)).unwrap_or(u32::MAX)))
}

/// A merge declaration in flattened-position coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSpan {
    /// Origin row (flat position)
    pub row: usize,
    /// Origin column (leaf position)
    pub col: usize,
    #[serde(default = "unit_extent", deserialize_with = "extent")]
    pub rowspan: u32,
    #[serde(default = "unit_extent", deserialize_with = "extent")]
    pub colspan: u32,
}

impl MergeSpan {
    pub fn new(row: usize, col: usize, rowspan: u32, colspan: u32) -> Self {
        Self {
            row,
            col,
            rowspan,
            colspan,
        }
    }

    /// A zero span suppresses its origin cell
    pub fn is_degenerate(&self) -> bool {
        self.rowspan == 0 || self.colspan == 0
    }

    /// Exclusive end row
    pub fn end_row(&self) -> usize {
        self.row.saturating_add(self.rowspan as usize)
    }

    /// Exclusive end column
    pub fn end_col(&self) -> usize {
        self.col.saturating_add(self.colspan as usize)
    }

    pub fn covers(&self, row: usize, col: usize) -> bool {
        row >= self.row && row < self.end_row() && col >= self.col && col < self.end_col()
    }

    /// Number of cells this span removes from a fully rendered grid
    pub fn hidden_cells(&self) -> usize {
        if self.is_degenerate() {
            return 1;
        }
        (self.rowspan as usize * self.colspan as usize).saturating_sub(1)
    }

    pub(crate) fn overlaps(&self, other: &MergeSpan) -> bool {
        self.row < other.end_row()
            && other.row < self.end_row()
            && self.col < other.end_col()
            && other.col < self.end_col()
    }
}

/// Answer of a span callback for one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanHint {
    #[serde(default = "unit_extent", deserialize_with = "extent")]
    pub rowspan: u32,
    #[serde(default = "unit_extent", deserialize_with = "extent")]
    pub colspan: u32,
}

impl Default for SpanHint {
    fn default() -> Self {
        Self {
            rowspan: 1,
            colspan: 1,
        }
    }
}

/// Resolution of one cell against the active span source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SpanState {
    /// Render one cell covering `rowspan x colspan` slots
    Origin { rowspan: u32, colspan: u32 },
    /// Covered by another origin (or zero span): render nothing
    Suppressed,
    /// Ordinary single cell
    Plain,
}

impl SpanState {
    /// Build the state from a `(rowspan, colspan)` pair. Zero in either
    /// dimension suppresses the cell; `1 x 1` is plain.
    pub fn from_hint(hint: SpanHint) -> Self {
        match (hint.rowspan, hint.colspan) {
            (0, _) | (_, 0) => Self::Suppressed,
            (1, 1) => Self::Plain,
            (rowspan, colspan) => Self::Origin { rowspan, colspan },
        }
    }

    pub fn is_rendered(&self) -> bool {
        !matches!(self, Self::Suppressed)
    }

    /// `(rowspan, colspan)` for rendered cells
    pub fn extent(&self) -> Option<(u32, u32)> {
        match *self {
            Self::Origin { rowspan, colspan } => Some((rowspan, colspan)),
            Self::Plain => Some((1, 1)),
            Self::Suppressed => None,
        }
    }
}
