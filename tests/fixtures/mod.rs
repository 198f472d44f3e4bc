//! Test fixtures for building grids in memory.
//!
//! Builders for datasets, column trees and configured engines, so each
//! test states only what it cares about.
//!
//! # Example
//!
//! ```rust,ignore
//! use fixtures::{GridBuilder, flat_records};
//!
//! let mut grid = GridBuilder::new()
//!     .row_height(24.0)
//!     .columns(&["name", "age"])
//!     .rows(flat_records(100))
//!     .view(800.0, 480.0)
//!     .build();
//! let pass = grid.render(&CellStatusMap::new());
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use gridview::config::{DragConfig, GridConfig, TreeConfig};
use gridview::{ColumnDescriptor, FixedSide, GridEngine, MergeSpan, RowId};
use serde_json::{json, Value};

// ============================================================================
// Records
// ============================================================================

/// `n` flat records keyed by `id` (0-based)
#[must_use]
pub fn flat_records(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| json!({"id": i, "name": format!("row {i}"), "age": 20 + i % 50}))
        .collect()
}

/// A tree record with an explicit identity
#[must_use]
pub fn node(id: &str, children: Vec<Value>) -> Value {
    if children.is_empty() {
        json!({"id": id, "name": id})
    } else {
        json!({"id": id, "name": id, "children": children})
    }
}

/// Root `R` with children `A` and `B`; `A` has two children
#[must_use]
pub fn family_tree() -> Vec<Value> {
    vec![node(
        "R",
        vec![
            node("A", vec![node("A.c1", vec![]), node("A.c2", vec![])]),
            node("B", vec![]),
        ],
    )]
}

/// Identities as plain strings
#[must_use]
pub fn ids<'a>(rows: impl IntoIterator<Item = &'a RowId>) -> Vec<String> {
    rows.into_iter().map(|id| id.as_str().to_string()).collect()
}

#[must_use]
pub fn rid(id: &str) -> RowId {
    RowId::new(id)
}

// ============================================================================
// Columns
// ============================================================================

/// One 100px column per field, ids equal to the field names
#[must_use]
pub fn columns(fields: &[&str]) -> Vec<ColumnDescriptor> {
    fields
        .iter()
        .map(|f| {
            let mut desc = ColumnDescriptor::new(*f).with_width(100.0);
            desc.id = Some((*f).into());
            desc
        })
        .collect()
}

/// A column fixed to one side
#[must_use]
pub fn fixed_column(field: &str, side: FixedSide) -> ColumnDescriptor {
    let mut desc = ColumnDescriptor::new(field)
        .with_width(80.0)
        .with_fixed(side);
    desc.id = Some(field.into());
    desc
}

// ============================================================================
// Grid Builder
// ============================================================================

/// Builder for a configured, loaded engine
#[derive(Debug, Clone)]
pub struct GridBuilder {
    config: GridConfig,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Value>,
    merges: Vec<MergeSpan>,
    view: (f32, f32),
}

impl Default for GridBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GridBuilder {
    #[must_use]
    pub fn new() -> Self {
        let mut config = GridConfig::default();
        config.row.key_fields = vec!["id".to_string()];
        Self {
            config,
            columns: columns(&["name"]),
            rows: Vec::new(),
            merges: Vec::new(),
            view: (800.0, 600.0),
        }
    }

    #[must_use]
    pub fn row_height(mut self, height: f32) -> Self {
        self.config.row.height = Some(height);
        self
    }

    #[must_use]
    pub fn preload(mut self, preload: usize) -> Self {
        self.config.virtual_y.preload = preload;
        self.config.virtual_x.preload = preload;
        self
    }

    #[must_use]
    pub fn tree(mut self, expanded: &[&str]) -> Self {
        self.config.tree = Some(TreeConfig {
            expand_row_keys: expanded.iter().map(|s| (*s).to_string()).collect(),
            ..TreeConfig::default()
        });
        self
    }

    #[must_use]
    pub fn detail(mut self, height: f32) -> Self {
        self.config.expand.enabled = true;
        self.config.expand.detail_height = Some(height);
        self
    }

    #[must_use]
    pub fn row_drag(mut self, drag: DragConfig) -> Self {
        self.config.row_drag = drag;
        self
    }

    #[must_use]
    pub fn column_drag(mut self, drag: DragConfig) -> Self {
        self.config.column_drag = drag;
        self
    }

    #[must_use]
    pub fn config(mut self, f: impl FnOnce(&mut GridConfig)) -> Self {
        f(&mut self.config);
        self
    }

    #[must_use]
    pub fn columns(mut self, fields: &[&str]) -> Self {
        self.columns = columns(fields);
        self
    }

    #[must_use]
    pub fn column_descriptors(mut self, columns: Vec<ColumnDescriptor>) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn rows(mut self, rows: Vec<Value>) -> Self {
        self.rows = rows;
        self
    }

    #[must_use]
    pub fn merges(mut self, merges: Vec<MergeSpan>) -> Self {
        self.merges = merges;
        self
    }

    #[must_use]
    pub fn view(mut self, width: f32, height: f32) -> Self {
        self.view = (width, height);
        self
    }

    /// Build the engine and run the first flush
    #[must_use]
    pub fn build(self) -> GridEngine {
        let mut engine = GridEngine::new(self.config).expect("valid config");
        engine.load_columns(self.columns);
        engine.load_rows(self.rows);
        if !self.merges.is_empty() {
            engine.set_merge_spans(self.merges);
        }
        engine.resize(self.view.0, self.view.1);
        engine.flush();
        engine
    }
}

/// Drag rules with only the switches a test names turned on
#[must_use]
pub fn drag_config(peer_only: bool, cross_level: bool) -> DragConfig {
    DragConfig {
        enabled: true,
        trigger: gridview::config::DragTrigger::Row,
        peer_only,
        cross_level,
    }
}
