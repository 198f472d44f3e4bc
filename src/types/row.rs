use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Marker prefix for engine-assigned identities. Key values are taken from
/// record fields and are never allowed to start with a control character,
/// so surrogates cannot collide with keyed identities.
const SURROGATE_PREFIX: char = '\u{1}';

/// Stable, position-independent row identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Engine-assigned identity for a record without a usable key
    pub(crate) fn surrogate(n: u64) -> Self {
        Self(format!("{SURROGATE_PREFIX}row:{n}"))
    }

    /// Positional identity used after a key collision
    pub(crate) fn positional(load_ordinal: usize) -> Self {
        Self(format!("{SURROGATE_PREFIX}pos:{load_ordinal}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for surrogate and positional identities
    pub fn is_engine_assigned(&self) -> bool {
        self.0.starts_with(SURROGATE_PREFIX)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RowId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A row record as held by the engine: identity, opaque application data
/// and (in tree mode) child nodes.
///
/// Children are lifted out of the record's children field at load time, so
/// `record` never contains them.
#[derive(Debug, Clone, PartialEq)]
pub struct RowNode {
    pub id: RowId,
    pub record: Value,
    pub children: Vec<RowNode>,
}

impl RowNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// User-visible row number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Seq {
    /// `increasing` mode: 1-based position among data rows
    Index(usize),
    /// Default mode: 1-based dotted path, first component is the top-level ordinal
    Path(Vec<usize>),
}

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(n) => write!(f, "{n}"),
            Self::Path(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
        }
    }
}

/// Derived per-row metadata. Recomputed on every flatten.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowMeta {
    pub id: RowId,
    /// Tree level (0 = top level)
    pub depth: usize,
    pub parent: Option<RowId>,
    /// Position in the flattened render sequence (detail slots counted)
    pub flat_position: usize,
    /// Position among data rows only (detail slots not counted)
    pub data_index: usize,
    /// Position among the parent's children
    pub sibling_index: usize,
    /// Position of the top-level ancestor in the source list
    pub top_level_index: usize,
    pub is_expanded: bool,
    pub has_children: bool,
    pub seq: Seq,
}

/// One slot of the flattened sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FlatRow {
    /// A data row
    Data(RowMeta),
    /// Synthetic detail slot following an expanded row
    #[serde(rename_all = "camelCase")]
    Detail {
        owner: RowId,
        depth: usize,
        flat_position: usize,
    },
}

impl FlatRow {
    /// Identity of the row, or of the owning row for a detail slot
    pub fn id(&self) -> &RowId {
        match self {
            Self::Data(meta) => &meta.id,
            Self::Detail { owner, .. } => owner,
        }
    }

    pub fn flat_position(&self) -> usize {
        match self {
            Self::Data(meta) => meta.flat_position,
            Self::Detail { flat_position, .. } => *flat_position,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Self::Data(meta) => meta.depth,
            Self::Detail { depth, .. } => *depth,
        }
    }

    pub fn is_detail(&self) -> bool {
        matches!(self, Self::Detail { .. })
    }

    pub fn meta(&self) -> Option<&RowMeta> {
        match self {
            Self::Data(meta) => Some(meta),
            Self::Detail { .. } => None,
        }
    }
}
