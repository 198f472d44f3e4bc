//! JavaScript-facing wrapper around [`GridEngine`].
//!
//! Inputs and outputs cross the boundary as plain JS objects through
//! serde-wasm-bindgen. Maps are emitted as plain objects so records read
//! back the way the host wrote them.

use std::fmt::Display;

use js_sys::Function;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;

use crate::layout::{Pane, SpanQuery};
use crate::render::{CellStatusEntry, CellStatusMap};
use crate::types::{ColumnDescriptor, ColumnId, MergeSpan, RowId, SpanHint};

use super::{GridEngine, WindowSnapshot};

#[cfg(target_arch = "wasm32")]
fn now_ms() -> f64 {
    if let Some(window) = web_sys::window() {
        if let Some(perf) = window.performance() {
            return perf.now();
        }
    }
    js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
fn now_ms() -> f64 {
    use std::time::Instant;
    thread_local! {
        static START: Instant = Instant::now();
    }
    START.with(|s| s.elapsed().as_secs_f64() * 1000.0)
}

fn js_error(e: impl Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(js_error)
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(js_error)
}

fn parse_pane(name: &str) -> Result<Pane, JsValue> {
    match name {
        "left" => Ok(Pane::Left),
        "main" => Ok(Pane::Main),
        "right" => Ok(Pane::Right),
        other => Err(JsValue::from_str(&format!("unknown pane {other:?}"))),
    }
}

/// Span callback backed by a JS function taking
/// `{row, col, rowId, columnId, field, record}` and returning
/// `{rowspan, colspan}` or nothing
fn js_span_method(callback: Function) -> Box<dyn Fn(&SpanQuery<'_>) -> Option<SpanHint>> {
    Box::new(move |query: &SpanQuery<'_>| {
        let arg = to_js(&json!({
            "row": query.row,
            "col": query.col,
            "rowId": query.row_id.map(RowId::as_str),
            "columnId": query.column.id.as_str(),
            "field": query.column.field,
            "record": query.record,
        }))
        .ok()?;
        let result = callback.call1(&JsValue::NULL, &arg).ok()?;
        if result.is_undefined() || result.is_null() {
            return None;
        }
        serde_wasm_bindgen::from_value::<SpanHint>(result).ok()
    })
}

/// The grid engine exported to JavaScript
#[wasm_bindgen]
pub struct GridView {
    engine: GridEngine,
    status: CellStatusMap,
}

#[wasm_bindgen]
impl GridView {
    /// Create a grid from a configuration object
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<GridView, JsValue> {
        console_error_panic_hook::set_once();
        let config = if config.is_undefined() || config.is_null() {
            crate::config::GridConfig::default()
        } else {
            from_js(config)?
        };
        Ok(GridView {
            engine: GridEngine::new(config).map_err(js_error)?,
            status: CellStatusMap::new(),
        })
    }

    #[wasm_bindgen]
    pub fn load_rows(&mut self, rows: JsValue) -> Result<(), JsValue> {
        let rows: Vec<Value> = from_js(rows)?;
        self.engine.load_rows(rows);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn load_columns(&mut self, columns: JsValue) -> Result<(), JsValue> {
        let columns: Vec<ColumnDescriptor> = from_js(columns)?;
        self.engine.load_columns(columns);
        Ok(())
    }

    /// Insert rows; returns the new identities
    #[wasm_bindgen]
    pub fn insert_rows(
        &mut self,
        rows: JsValue,
        parent: Option<String>,
        index: Option<usize>,
    ) -> Result<JsValue, JsValue> {
        let rows: Vec<Value> = from_js(rows)?;
        let parent = parent.map(RowId::new);
        let ids = self
            .engine
            .insert_rows(rows, parent.as_ref(), index)
            .map_err(js_error)?;
        to_js(&ids)
    }

    #[wasm_bindgen]
    pub fn remove_rows(&mut self, ids: Vec<String>) -> usize {
        let ids: Vec<RowId> = ids.into_iter().map(RowId::new).collect();
        self.engine.remove_rows(&ids)
    }

    #[wasm_bindgen]
    pub fn update_row(&mut self, id: &str, record: JsValue) -> Result<(), JsValue> {
        let record: Value = from_js(record)?;
        self.engine
            .update_row(&RowId::new(id), record)
            .map_err(js_error)
    }

    #[wasm_bindgen]
    pub fn export_rows(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.export_rows())
    }

    #[wasm_bindgen]
    pub fn set_footer_data(&mut self, rows: JsValue) -> Result<(), JsValue> {
        let rows: Vec<Value> = from_js(rows)?;
        self.engine.set_footer_data(rows);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn set_merge_spans(&mut self, spans: JsValue) -> Result<(), JsValue> {
        let spans: Vec<MergeSpan> = from_js(spans)?;
        self.engine.set_merge_spans(spans);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn set_footer_merge_spans(&mut self, spans: JsValue) -> Result<(), JsValue> {
        let spans: Vec<MergeSpan> = from_js(spans)?;
        self.engine.set_footer_merge_spans(spans);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn set_span_method(&mut self, callback: Option<Function>) {
        self.engine.set_span_method(callback.map(js_span_method));
    }

    #[wasm_bindgen]
    pub fn set_footer_span_method(&mut self, callback: Option<Function>) {
        self.engine
            .set_footer_span_method(callback.map(js_span_method));
    }

    /// Replace the validation status snapshot
    #[wasm_bindgen]
    pub fn set_cell_status(&mut self, entries: JsValue) -> Result<(), JsValue> {
        let entries: Vec<CellStatusEntry> = from_js(entries)?;
        self.status = CellStatusMap::from_entries(entries);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn toggle_row_expand(&mut self, id: &str) -> Result<bool, JsValue> {
        self.engine
            .toggle_row_expand(&RowId::new(id))
            .map_err(js_error)
    }

    #[wasm_bindgen]
    pub fn set_all_row_expand(&mut self, expanded: bool) {
        self.engine.set_all_row_expand(expanded);
    }

    #[wasm_bindgen]
    pub fn toggle_row_detail(&mut self, id: &str) -> Result<bool, JsValue> {
        self.engine
            .toggle_row_detail(&RowId::new(id))
            .map_err(js_error)
    }

    #[wasm_bindgen]
    pub fn set_row_height(&mut self, id: &str, height: f32) -> bool {
        self.engine.set_row_height(&RowId::new(id), height)
    }

    #[wasm_bindgen]
    pub fn set_column_width(&mut self, id: &str, width: f32) -> bool {
        self.engine.set_column_width(&ColumnId::new(id), width)
    }

    #[wasm_bindgen]
    pub fn set_current_row(&mut self, id: Option<String>) {
        self.engine.set_current_row(id.map(RowId::new));
    }

    #[wasm_bindgen]
    pub fn set_current_column(&mut self, id: Option<String>) {
        self.engine.set_current_column(id.map(ColumnId::new));
    }

    #[wasm_bindgen]
    pub fn resize(&mut self, width: f32, height: f32) {
        self.engine.resize(width, height);
    }

    /// Native scroll event from `pane` ("left", "main" or "right").
    /// Returns the writes to apply to the other panes, or null.
    #[wasm_bindgen]
    pub fn on_scroll(&mut self, pane: &str, top: f32, left: f32) -> Result<JsValue, JsValue> {
        let pane = parse_pane(pane)?;
        to_js(&self.engine.on_scroll(pane, top, left))
    }

    #[wasm_bindgen]
    pub fn on_wheel(&mut self, delta_x: f32, delta_y: f32) -> Result<JsValue, JsValue> {
        to_js(&self.engine.on_wheel(delta_x, delta_y))
    }

    #[wasm_bindgen]
    pub fn scroll_to_row(&mut self, id: &str) -> Result<JsValue, JsValue> {
        let update = self
            .engine
            .scroll_to_row(&RowId::new(id))
            .map_err(js_error)?;
        to_js(&update)
    }

    #[wasm_bindgen]
    pub fn drag_start_row(&mut self, id: &str, x: f32, y: f32) -> Result<(), JsValue> {
        self.engine
            .drag_start_row(&RowId::new(id), (x, y))
            .map_err(js_error)
    }

    #[wasm_bindgen]
    pub fn drag_start_column(&mut self, id: &str, x: f32, y: f32) -> Result<(), JsValue> {
        self.engine
            .drag_start_column(&ColumnId::new(id), (x, y))
            .map_err(js_error)
    }

    #[wasm_bindgen]
    pub fn drag_move(&mut self, x: f32, y: f32, hover: usize) -> Result<JsValue, JsValue> {
        to_js(&self.engine.drag_move((x, y), hover))
    }

    #[wasm_bindgen]
    pub fn drag_end(&mut self) -> Result<bool, JsValue> {
        self.engine.drag_end().map_err(js_error)
    }

    #[wasm_bindgen]
    pub fn drag_cancel(&mut self) -> bool {
        self.engine.drag_cancel()
    }

    /// Call `callback` with the materialized windows after the next flush
    #[wasm_bindgen]
    pub fn after_render(&mut self, callback: Function) {
        self.engine
            .after_render(Box::new(move |snapshot: &WindowSnapshot| {
                if let Ok(arg) = to_js(snapshot) {
                    let _ = callback.call1(&JsValue::NULL, &arg);
                }
            }));
    }

    #[wasm_bindgen]
    pub fn flush(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.flush())
    }

    /// Compose every pane for the current state
    #[wasm_bindgen]
    pub fn render(&mut self) -> Result<JsValue, JsValue> {
        let started = now_ms();
        let pass = self.engine.render(&self.status);
        tracing::debug!(
            target: "gridview",
            elapsed_ms = now_ms() - started,
            rows = pass.pane(Pane::Main).map_or(0, |p| p.rows.len()),
            "render"
        );
        to_js(&pass)
    }

    /// Diagnostics reported since the last call
    #[wasm_bindgen]
    pub fn diagnostics(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.take_diagnostics())
    }
}

impl GridView {
    /// Wrapped engine, for native hosts and tests
    pub fn engine(&mut self) -> &mut GridEngine {
        &mut self.engine
    }
}
