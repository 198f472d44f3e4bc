//! Read-only view of validation results.
//!
//! The engine never runs validation. A host-side validator publishes its
//! latest results into a [`CellStatusSource`], which cell composition
//! reads to flag invalid and dirty cells.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{ColumnId, RowId};

/// A failed validation rule for one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub rule: String,
    /// Message shown by the inline error affordance
    pub content: String,
}

/// Per-cell validation status
pub trait CellStatusSource {
    fn error(&self, row: &RowId, column: &ColumnId) -> Option<&ValidationError>;

    fn is_dirty(&self, row: &RowId, column: &ColumnId) -> bool;
}

/// One entry of a status snapshot as published by the host
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellStatusEntry {
    pub row_id: RowId,
    pub column_id: ColumnId,
    #[serde(default)]
    pub error: Option<ValidationError>,
    #[serde(default)]
    pub dirty: bool,
}

/// Status of one cell in a [`CellStatusMap`]
#[derive(Debug, Clone, Default)]
struct CellStatus {
    error: Option<ValidationError>,
    dirty: bool,
}

/// In-memory status map, keyed row first so lookups borrow their keys
#[derive(Debug, Clone, Default)]
pub struct CellStatusMap {
    rows: HashMap<RowId, HashMap<ColumnId, CellStatus>>,
}

impl CellStatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = CellStatusEntry>) -> Self {
        let mut map = Self::new();
        for entry in entries {
            let status = map.cell_mut(entry.row_id, entry.column_id);
            status.dirty |= entry.dirty;
            if entry.error.is_some() {
                status.error = entry.error;
            }
        }
        map
    }

    fn cell_mut(&mut self, row: RowId, column: ColumnId) -> &mut CellStatus {
        self.rows.entry(row).or_default().entry(column).or_default()
    }

    fn cell(&self, row: &RowId, column: &ColumnId) -> Option<&CellStatus> {
        self.rows.get(row)?.get(column)
    }

    pub fn set_error(&mut self, row: RowId, column: ColumnId, error: ValidationError) {
        self.cell_mut(row, column).error = Some(error);
    }

    pub fn mark_dirty(&mut self, row: RowId, column: ColumnId) {
        self.cell_mut(row, column).dirty = true;
    }
}

impl CellStatusSource for CellStatusMap {
    fn error(&self, row: &RowId, column: &ColumnId) -> Option<&ValidationError> {
        self.cell(row, column)?.error.as_ref()
    }

    fn is_dirty(&self, row: &RowId, column: &ColumnId) -> bool {
        self.cell(row, column).is_some_and(|status| status.dirty)
    }
}
