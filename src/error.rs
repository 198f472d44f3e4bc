//! Structured error types for gridview.
//!
//! Nothing in the engine is fatal. Most of these errors are recovered
//! locally (reported through [`crate::diagnostics::Diagnostics`] and
//! replaced by a safe fallback); only true misconfiguration reaches the
//! hosting application as an `Err`.

/// All errors that can occur while configuring or driving the grid engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    /// Invalid or conflicting configuration (overlapping merges, impossible sizes, ...).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Two rows resolved to the same identity.
    #[error("Identity collision: {0}")]
    IdentityCollision(String),

    /// A drag was refused (axis disabled, unknown identity, illegal drop target).
    #[error("Drag rejected: {0}")]
    DragRejected(String),

    /// JSON (de)serialization error for records and configuration.
    #[error("JSON: {0}")]
    Json(String),

    /// Catch-all for string errors.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;

impl From<serde_json::Error> for GridError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

impl From<String> for GridError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

#[cfg(target_arch = "wasm32")]
impl From<GridError> for wasm_bindgen::JsValue {
    fn from(e: GridError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
