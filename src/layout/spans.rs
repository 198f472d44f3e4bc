//! Merge-span resolution.
//!
//! A [`MergeTable`] holds precomputed spans in flat coordinates. Short
//! lists are scanned linearly; longer ones are indexed by every covered
//! cell, like the sheet layout's merge map, so a lookup is one hash probe.
//! [`SpanResolver`] combines the table with an optional per-cell callback.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use serde_json::Value;

use crate::config::SpanPrecedence;
use crate::diagnostics::Diagnostics;
use crate::error::GridError;
use crate::types::{ColumnMeta, MergeSpan, RowId, SpanHint, SpanState};

/// Span lists up to this length are scanned linearly
pub const LINEAR_SCAN_MAX_SPANS: usize = 16;

/// Largest number of covered cells the table will index. Bigger tables
/// are dropped with a warning and every cell resolves PLAIN.
pub const MAX_INDEXED_CELLS: usize = 2_000_000;

#[derive(Debug, Clone, Default)]
enum Lookup {
    #[default]
    Linear,
    /// Covered cell -> index into `spans`
    Indexed(HashMap<(usize, usize), usize>),
}

/// Precomputed merge spans
#[derive(Debug, Clone, Default)]
pub struct MergeTable {
    spans: Vec<MergeSpan>,
    lookup: Lookup,
}

impl MergeTable {
    /// Build a table.
    ///
    /// Overlapping spans are a configuration error reported once under
    /// `{key}-overlap`. No span of a conflicting pair wins: every span that
    /// overlaps another is left out, so its cells resolve PLAIN.
    pub fn build(spans: Vec<MergeSpan>, key: &str, diag: &mut Diagnostics) -> Self {
        let linear = spans.len() <= LINEAR_SCAN_MAX_SPANS;
        let covered = spans
            .iter()
            .fold(0usize, |acc, span| acc.saturating_add(footprint_cells(span)));
        if !linear && covered > MAX_INDEXED_CELLS {
            diag.warn(
                format!("{key}-limit"),
                format!(
                    "merge list covers {covered} cells (limit {MAX_INDEXED_CELLS}); spans ignored"
                ),
            );
            return Self::default();
        }

        let conflicted = if linear {
            pairwise_conflicts(&spans)
        } else {
            covered_conflicts(&spans, covered)
        };
        report_overlaps(key, conflicted.iter().filter(|c| **c).count(), diag);
        let kept: Vec<MergeSpan> = spans
            .into_iter()
            .zip(conflicted)
            .filter_map(|(span, conflict)| (!conflict).then_some(span))
            .collect();

        let lookup = if linear {
            Lookup::Linear
        } else {
            let mut index: HashMap<(usize, usize), usize> = HashMap::with_capacity(covered);
            for (id, span) in kept.iter().enumerate() {
                index.extend(footprint(span).map(|cell| (cell, id)));
            }
            Lookup::Indexed(index)
        };
        Self {
            spans: kept,
            lookup,
        }
    }

    pub fn spans(&self) -> &[MergeSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Whether lookups go through the covered-cell index
    pub fn is_indexed(&self) -> bool {
        matches!(self.lookup, Lookup::Indexed(_))
    }

    fn span_at(&self, row: usize, col: usize) -> Option<&MergeSpan> {
        match &self.lookup {
            Lookup::Linear => self
                .spans
                .iter()
                .find(|s| footprint_contains(s, row, col)),
            Lookup::Indexed(index) => index.get(&(row, col)).and_then(|i| self.spans.get(*i)),
        }
    }

    /// State of a cell, `None` when no span covers it
    pub fn resolve(&self, row: usize, col: usize) -> Option<SpanState> {
        let span = self.span_at(row, col)?;
        if span.row == row && span.col == col {
            Some(SpanState::from_hint(SpanHint {
                rowspan: span.rowspan,
                colspan: span.colspan,
            }))
        } else {
            Some(SpanState::Suppressed)
        }
    }

    /// Spans with a rendered origin that intersect `rows x cols`
    pub fn intersecting<'a>(
        &'a self,
        rows: &'a Range<usize>,
        cols: &'a Range<usize>,
    ) -> impl Iterator<Item = &'a MergeSpan> + 'a {
        self.spans.iter().filter(move |s| {
            !s.is_degenerate()
                && s.row < rows.end
                && s.end_row() > rows.start
                && s.col < cols.end
                && s.end_col() > cols.start
        })
    }
}

/// Degenerate spans occupy only their origin
fn footprint(span: &MergeSpan) -> impl Iterator<Item = (usize, usize)> + Clone {
    let (rows, cols) = if span.is_degenerate() {
        (span.row..span.row + 1, span.col..span.col + 1)
    } else {
        (span.row..span.end_row(), span.col..span.end_col())
    };
    rows.flat_map(move |r| cols.clone().map(move |c| (r, c)))
}

fn footprint_cells(span: &MergeSpan) -> usize {
    if span.is_degenerate() {
        1
    } else {
        (span.rowspan as usize).saturating_mul(span.colspan as usize)
    }
}

fn footprint_contains(span: &MergeSpan, row: usize, col: usize) -> bool {
    if span.is_degenerate() {
        span.row == row && span.col == col
    } else {
        span.covers(row, col)
    }
}

fn footprint_overlaps(a: &MergeSpan, b: &MergeSpan) -> bool {
    match (a.is_degenerate(), b.is_degenerate()) {
        (false, false) => a.overlaps(b),
        (true, _) => footprint_contains(b, a.row, a.col),
        (false, true) => footprint_contains(a, b.row, b.col),
    }
}

fn mark(conflicted: &mut [bool], i: usize) {
    if let Some(flag) = conflicted.get_mut(i) {
        *flag = true;
    }
}

/// O(n^2) over short lists
fn pairwise_conflicts(spans: &[MergeSpan]) -> Vec<bool> {
    let mut conflicted = vec![false; spans.len()];
    for (i, a) in spans.iter().enumerate() {
        for (j, b) in spans.iter().enumerate().skip(i + 1) {
            if footprint_overlaps(a, b) {
                mark(&mut conflicted, i);
                mark(&mut conflicted, j);
            }
        }
    }
    conflicted
}

/// Every overlapping pair shares a covered cell, so tracking the first
/// claimant of each cell finds all of them.
fn covered_conflicts(spans: &[MergeSpan], covered: usize) -> Vec<bool> {
    let mut conflicted = vec![false; spans.len()];
    let mut claimed: HashMap<(usize, usize), usize> = HashMap::with_capacity(covered);
    for (i, span) in spans.iter().enumerate() {
        for cell in footprint(span) {
            match claimed.entry(cell) {
                Entry::Occupied(first) => {
                    mark(&mut conflicted, *first.get());
                    mark(&mut conflicted, i);
                }
                Entry::Vacant(slot) => {
                    slot.insert(i);
                }
            }
        }
    }
    conflicted
}

fn report_overlaps(key: &str, conflicting: usize, diag: &mut Diagnostics) {
    if conflicting > 0 {
        diag.report(
            format!("{key}-overlap"),
            &GridError::Configuration(format!(
                "{conflicting} merge spans overlap; their cells render unmerged"
            )),
        );
    }
}

/// Cell handed to a span callback
#[derive(Debug, Clone, Copy)]
pub struct SpanQuery<'a> {
    /// Flat row position (footer row index for footer spans)
    pub row: usize,
    /// Leaf column position
    pub col: usize,
    /// `None` for footer rows
    pub row_id: Option<&'a RowId>,
    pub column: &'a ColumnMeta,
    pub record: &'a Value,
}

/// Per-cell span callback
pub type SpanMethod = Box<dyn Fn(&SpanQuery<'_>) -> Option<SpanHint>>;

/// Resolves cells against the merge table and/or a span callback
#[derive(Default)]
pub struct SpanResolver {
    table: MergeTable,
    method: Option<SpanMethod>,
    precedence: SpanPrecedence,
}

impl fmt::Debug for SpanResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanResolver")
            .field("table", &self.table)
            .field("method", &self.method.is_some())
            .field("precedence", &self.precedence)
            .finish()
    }
}

impl SpanResolver {
    pub fn new(precedence: SpanPrecedence) -> Self {
        Self {
            precedence,
            ..Self::default()
        }
    }

    pub fn set_table(&mut self, table: MergeTable) {
        self.table = table;
    }

    pub fn table(&self) -> &MergeTable {
        &self.table
    }

    pub fn set_method(&mut self, method: Option<SpanMethod>) {
        self.method = method;
    }

    pub fn has_method(&self) -> bool {
        self.method.is_some()
    }

    pub fn set_precedence(&mut self, precedence: SpanPrecedence) {
        self.precedence = precedence;
    }

    /// Whether any span source is active
    pub fn is_active(&self) -> bool {
        !self.table.is_empty() || self.method.is_some()
    }

    /// Resolve one cell.
    ///
    /// Only one source is consulted per resolver: the preferred one if it
    /// is present, otherwise the other. A callback answering `None` leaves
    /// the cell PLAIN.
    pub fn resolve(&self, query: &SpanQuery<'_>) -> SpanState {
        let use_table = match (self.table.is_empty(), &self.method) {
            (true, None) => return SpanState::Plain,
            (false, None) => true,
            (true, Some(_)) => false,
            (false, Some(_)) => self.precedence == SpanPrecedence::Table,
        };
        if use_table {
            return self
                .table
                .resolve(query.row, query.col)
                .unwrap_or(SpanState::Plain);
        }
        self.method
            .as_ref()
            .and_then(|m| m(query))
            .map_or(SpanState::Plain, SpanState::from_hint)
    }

    /// Widen a materialized range so the origin of every table span that
    /// intersects it is materialized as well.
    ///
    /// Callback spans cannot be enumerated and are not considered.
    pub fn extend_window(&self, rows: Range<usize>, cols: Range<usize>) -> (Range<usize>, Range<usize>) {
        if self.table.is_empty() || self.uses_method_first() || rows.is_empty() || cols.is_empty() {
            return (rows, cols);
        }
        let mut row_start = rows.start;
        let mut col_start = cols.start;
        for span in self.table.intersecting(&rows, &cols) {
            row_start = row_start.min(span.row);
            col_start = col_start.min(span.col);
        }
        (row_start..rows.end, col_start..cols.end)
    }

    fn uses_method_first(&self) -> bool {
        self.method.is_some() && self.precedence == SpanPrecedence::Callback
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

    fn table(spans: Vec<MergeSpan>) -> (MergeTable, Diagnostics) {
        let mut diag = Diagnostics::new();
        let t = MergeTable::build(spans, "merge", &mut diag);
        (t, diag)
    }

    #[test]
    fn test_origin_and_suppressed() {
        let (t, _) = table(vec![MergeSpan::new(0, 0, 2, 2), MergeSpan::new(0, 2, 1, 1)]);
        assert!(!t.is_indexed());
        assert_eq!(
            t.resolve(0, 0),
            Some(SpanState::Origin {
                rowspan: 2,
                colspan: 2
            })
        );
        assert_eq!(t.resolve(1, 1), Some(SpanState::Suppressed));
        assert_eq!(t.resolve(0, 2), Some(SpanState::Plain));
        assert_eq!(t.resolve(2, 2), None);
    }

    #[test]
    fn test_overlap_reported_once_and_dropped() {
        let (t, mut diag) = table(vec![
            MergeSpan::new(0, 0, 2, 2),
            MergeSpan::new(1, 1, 2, 2),
            MergeSpan::new(4, 0, 1, 2),
        ]);
        assert_eq!(t.spans(), [MergeSpan::new(4, 0, 1, 2)]);
        assert_eq!(t.resolve(0, 0), None);
        assert_eq!(t.resolve(1, 1), None);
        assert_eq!(t.resolve(2, 2), None);
        let reports = diag.drain();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].key, "merge-overlap");
    }

    #[test]
    fn test_large_table_is_indexed() {
        let spans: Vec<MergeSpan> = (0..40).map(|i| MergeSpan::new(i * 2, 0, 2, 3)).collect();
        let (t, _) = table(spans);
        assert!(t.is_indexed());
        assert_eq!(t.len(), 40);
        assert_eq!(t.resolve(79, 2), Some(SpanState::Suppressed));
        assert_eq!(t.resolve(78, 3), None);
    }

    #[test]
    fn test_oversized_table_falls_back_to_plain() {
        let spans: Vec<MergeSpan> = (0..20).map(|i| MergeSpan::new(i, 0, 1, 200_000)).collect();
        let (t, diag) = table(spans);
        assert!(t.is_empty());
        assert!(diag.has_reported("merge-limit"));
    }

    #[test]
    fn test_degenerate_span_suppresses_origin_only() {
        let (t, _) = table(vec![MergeSpan::new(3, 3, 0, 5)]);
        assert_eq!(t.resolve(3, 3), Some(SpanState::Suppressed));
        assert_eq!(t.resolve(3, 4), None);
    }

    #[test]
    fn test_extend_window_to_origin() {
        let (t, _) = table(vec![MergeSpan::new(2, 1, 4, 2)]);
        let mut resolver = SpanResolver::new(SpanPrecedence::Table);
        resolver.set_table(t);
        let (rows, cols) = resolver.extend_window(4..10, 2..5);
        assert_eq!(rows, 2..10);
        assert_eq!(cols, 1..5);
        // Span entirely above the window is not pulled in
        let (rows, _) = resolver.extend_window(6..10, 0..5);
        assert_eq!(rows, 6..10);
    }
}
