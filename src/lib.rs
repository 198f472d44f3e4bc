//! gridview - virtualized data-grid layout engine
//!
//! Computes everything a host needs to render a large table smoothly:
//! - Vertical and horizontal windowing over flattened rows and leaf columns
//! - Left/right fixed panes kept in scroll lockstep
//! - Merged cells from a static list or a per-cell callback
//! - Tree rows and detail rows flattened into one sequence
//! - Live drag reordering of rows and columns
//! - A complete parameter record for every rendered cell
//!
//! Painting is left to the host.
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { GridView } from 'gridview';
//! await init();
//! const grid = new GridView({ row: { height: 36 } });
//! grid.load_columns(columns);
//! grid.load_rows(rows);
//! grid.resize(width, height);
//! const pass = grid.render();
//! ```

pub mod config;
pub mod diagnostics;
pub mod drag;
pub mod error;
pub mod index;
pub mod layout;
pub mod render;
pub mod snapshot;
pub mod tree;
pub mod types;
pub mod viewer;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use config::GridConfig;
pub use error::{GridError, Result};
pub use snapshot::Snapshot;
pub use viewer::{GridEngine, GridView};

pub use types::*;

/// Render a complete grid description in one call
///
/// # Errors
/// Returns an error if the description is malformed or the configuration
/// is invalid.
#[wasm_bindgen]
pub fn render_snapshot(input: JsValue) -> std::result::Result<JsValue, JsValue> {
    let snapshot: Snapshot = serde_wasm_bindgen::from_value(input)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let (pass, _) = snapshot
        .render()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    pass.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
}

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
