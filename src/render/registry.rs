//! Cell renderer registry.
//!
//! Renderers are looked up by the name a column declares. The engine hands
//! each renderer a complete [`CellParams`] record and embeds whatever
//! [`CellContent`] comes back without looking inside it.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::types::Align;

use super::CellParams;

/// Name the fallback text renderer is registered under
pub const DEFAULT_RENDERER: &str = "default";

/// Name of the built-in sequence-number renderer
pub const SEQ_RENDERER: &str = "seq";

/// Opaque renderer output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum CellContent {
    Empty,
    Text(String),
    /// Structured output for the host to interpret
    Value(Value),
}

/// A pluggable cell renderer
pub trait CellRenderer {
    /// Content of a body cell
    fn render_cell(&self, params: &CellParams, record: &Value) -> CellContent;

    /// Content of a footer cell; `record` is the footer row
    fn render_footer(&self, params: &CellParams, record: &Value) -> CellContent;

    /// Alignment used when the column does not set one
    fn default_align(&self) -> Option<Align> {
        None
    }
}

/// Field value as text
pub fn value_text(value: &Value) -> CellContent {
    match value {
        Value::Null => CellContent::Empty,
        Value::String(s) => CellContent::Text(s.clone()),
        Value::Bool(b) => CellContent::Text(b.to_string()),
        Value::Number(n) => CellContent::Text(n.to_string()),
        other => CellContent::Text(other.to_string()),
    }
}

fn field_text(params: &CellParams, record: &Value) -> CellContent {
    params
        .field
        .as_deref()
        .and_then(|f| record.get(f))
        .map_or(CellContent::Empty, value_text)
}

/// Renders the column's field as text
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTextRenderer;

impl CellRenderer for DefaultTextRenderer {
    fn render_cell(&self, params: &CellParams, record: &Value) -> CellContent {
        field_text(params, record)
    }

    fn render_footer(&self, params: &CellParams, record: &Value) -> CellContent {
        field_text(params, record)
    }
}

/// Renders the row's sequence number
#[derive(Debug, Clone, Copy, Default)]
pub struct SeqRenderer;

impl CellRenderer for SeqRenderer {
    fn render_cell(&self, params: &CellParams, _record: &Value) -> CellContent {
        params
            .seq
            .as_ref()
            .map_or(CellContent::Empty, |seq| CellContent::Text(seq.to_string()))
    }

    fn render_footer(&self, params: &CellParams, record: &Value) -> CellContent {
        field_text(params, record)
    }

    fn default_align(&self) -> Option<Align> {
        Some(Align::Center)
    }
}

/// Name -> renderer map
pub struct RendererRegistry {
    renderers: HashMap<String, Box<dyn CellRenderer>>,
    fallback: DefaultTextRenderer,
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.renderers.keys().collect();
        names.sort();
        f.debug_struct("RendererRegistry").field("names", &names).finish()
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererRegistry {
    /// Registry with the built-in renderers
    pub fn new() -> Self {
        let mut registry = Self {
            renderers: HashMap::new(),
            fallback: DefaultTextRenderer,
        };
        registry.register(DEFAULT_RENDERER, Box::new(DefaultTextRenderer));
        registry.register(SEQ_RENDERER, Box::new(SeqRenderer));
        registry
    }

    /// Register a renderer, returning the one it replaces
    pub fn register(
        &mut self,
        name: impl Into<String>,
        renderer: Box<dyn CellRenderer>,
    ) -> Option<Box<dyn CellRenderer>> {
        self.renderers.insert(name.into(), renderer)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.renderers.contains_key(name)
    }

    /// Renderer for a column; unknown or missing names get the default
    pub fn get(&self, name: Option<&str>) -> &dyn CellRenderer {
        name.or(Some(DEFAULT_RENDERER))
            .and_then(|n| self.renderers.get(n))
            .or_else(|| self.renderers.get(DEFAULT_RENDERER))
            .map_or(&self.fallback as &dyn CellRenderer, |r| r.as_ref())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::types::Seq;
    use serde_json::json;

    struct Upper;

    impl CellRenderer for Upper {
        fn render_cell(&self, params: &CellParams, record: &Value) -> CellContent {
            match field_text(params, record) {
                CellContent::Text(t) => CellContent::Text(t.to_uppercase()),
                other => other,
            }
        }

        fn render_footer(&self, _params: &CellParams, _record: &Value) -> CellContent {
            CellContent::Empty
        }
    }

    fn params(field: &str) -> CellParams {
        CellParams {
            field: Some(field.to_string()),
            seq: Some(Seq::Index(4)),
            ..CellParams::default()
        }
    }

    #[test]
    fn test_default_renderer_text() {
        let registry = RendererRegistry::new();
        let record = json!({"name": "ada", "age": 36, "tags": null});
        let r = registry.get(None);
        assert_eq!(r.render_cell(&params("name"), &record), CellContent::Text("ada".into()));
        assert_eq!(r.render_cell(&params("age"), &record), CellContent::Text("36".into()));
        assert_eq!(r.render_cell(&params("tags"), &record), CellContent::Empty);
        assert_eq!(r.render_cell(&params("missing"), &record), CellContent::Empty);
    }

    #[test]
    fn test_lookup_and_fallback() {
        let mut registry = RendererRegistry::new();
        registry.register("upper", Box::new(Upper));
        let record = json!({"name": "ada"});
        let upper = registry.get(Some("upper"));
        assert_eq!(upper.render_cell(&params("name"), &record), CellContent::Text("ADA".into()));
        let unknown = registry.get(Some("nope"));
        assert_eq!(unknown.render_cell(&params("name"), &record), CellContent::Text("ada".into()));
        let seq = registry.get(Some(SEQ_RENDERER));
        assert_eq!(seq.render_cell(&params("name"), &record), CellContent::Text("4".into()));
        assert_eq!(seq.default_align(), Some(Align::Center));
    }
}
