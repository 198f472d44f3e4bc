//! The grid engine - owner of the dataset and every derived structure.
//!
//! This module provides `GridEngine`, which:
//! - Loads rows and columns and keeps their identity indexes current
//! - Rebuilds the flattened row sequence once per structural mutation
//! - Computes the vertical and horizontal windows (see `scroll`)
//! - Drives drag reordering (see `events`)
//! - Produces one `RenderPass` per frame
//!
//! The wasm-facing `GridView` wrapper lives in `bindings`.

mod bindings;
mod events;
mod scroll;
mod tasks;

pub use bindings::GridView;
pub use tasks::{AfterRender, FlushReport, TaskQueue, WindowSnapshot};

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use serde_json::Value;

use crate::config::{GridConfig, SeqMode};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::drag::{DragItem, DragSplicer};
use crate::error::{GridError, Result};
use crate::index::{self, ColumnIndex, RowIndex, RowLoader};
use crate::layout::{
    is_optimize_mode, pane_columns, pane_widths, AxisSizing, MergeTable, Pane, PaneColumn,
    PaneSync, SpanMethod, SpanResolver, Viewport, WindowCalculator,
};
use crate::render::{
    rows_aligned, CellComposer, CellRenderer, CellStatusSource, PaneRender, RenderPass,
    RenderedRow, RendererRegistry,
};
use crate::tree::{self, ExpansionState, FlattenOptions};
use crate::types::{
    AxisMode, ColumnDescriptor, ColumnId, FlatRow, MergeSpan, RowId, RowNode, WindowState,
};

/// Virtualized grid engine.
///
/// Single-threaded: every operation runs to completion before the next.
/// Structural mutations only bump a version; derived structures are
/// rebuilt lazily, once, at the next flush or render.
pub struct GridEngine {
    config: GridConfig,
    diagnostics: Diagnostics,

    // Source data
    nodes: Vec<RowNode>,
    descriptors: Vec<ColumnDescriptor>,
    footer: Vec<Value>,
    next_surrogate: u64,
    expansion: ExpansionState,

    // Derived from the source data
    paths: HashMap<RowId, Vec<usize>>,
    flat: Vec<FlatRow>,
    row_index: RowIndex,
    columns: ColumnIndex,
    /// Measured heights for auto-height rows
    measured: HashMap<RowId, f32>,
    row_axis: AxisSizing,
    /// Widths of every leaf in display order
    col_axis: AxisSizing,
    /// Widths of the scrollable leaves only
    center_axis: AxisSizing,

    structure_version: u64,
    built_version: u64,
    row_sizing_version: u64,
    column_version: u64,
    column_sizing_version: u64,

    // Scroll state
    viewport: Viewport,
    pane_sync: PaneSync,
    y_calc: WindowCalculator,
    x_calc: WindowCalculator,
    row_window: WindowState,
    column_window: WindowState,
    windows_stale: bool,

    spans: SpanResolver,
    footer_spans: SpanResolver,
    drag: DragSplicer,
    tasks: TaskQueue,
    registry: RendererRegistry,
    current_row: Option<RowId>,
    current_column: Option<ColumnId>,
}

impl GridEngine {
    /// Create an engine. Impossible sizes in `config` are an error; soft
    /// conflicts are reported through [`GridEngine::take_diagnostics`].
    pub fn new(mut config: GridConfig) -> Result<Self> {
        let mut diagnostics = Diagnostics::new();
        config.validate(&mut diagnostics)?;
        let precedence = config.span.precedence;
        Ok(Self {
            y_calc: WindowCalculator::new(config.virtual_y.clone()),
            x_calc: WindowCalculator::new(config.virtual_x.clone()),
            row_window: WindowState::empty(AxisMode::Static, config.virtual_y.preload),
            column_window: WindowState::empty(AxisMode::Static, config.virtual_x.preload),
            config,
            diagnostics,
            nodes: Vec::new(),
            descriptors: Vec::new(),
            footer: Vec::new(),
            next_surrogate: 0,
            expansion: ExpansionState::new(),
            paths: HashMap::new(),
            flat: Vec::new(),
            row_index: RowIndex::default(),
            columns: ColumnIndex::default(),
            measured: HashMap::new(),
            row_axis: AxisSizing::fixed(0.0, 0),
            col_axis: AxisSizing::fixed(0.0, 0),
            center_axis: AxisSizing::fixed(0.0, 0),
            // Nothing built yet
            structure_version: 1,
            built_version: 0,
            row_sizing_version: 0,
            column_version: 0,
            column_sizing_version: 0,
            viewport: Viewport::default(),
            pane_sync: PaneSync::new(),
            windows_stale: true,
            spans: SpanResolver::new(precedence),
            footer_spans: SpanResolver::new(precedence),
            drag: DragSplicer::new(),
            tasks: TaskQueue::new(),
            registry: RendererRegistry::new(),
            current_row: None,
            current_column: None,
        })
    }

    /// Parse the configuration from JSON and create an engine
    pub fn from_json(config: &str) -> Result<Self> {
        Self::new(GridConfig::from_json(config)?)
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Drain the diagnostics reported since the last call
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.drain()
    }

    fn children_field(&self) -> Option<&str> {
        self.config.tree.as_ref().map(|t| t.children_field.as_str())
    }

    fn mark_structure_changed(&mut self) {
        self.structure_version = self.structure_version.wrapping_add(1);
        self.windows_stale = true;
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// Replace the dataset.
    ///
    /// Expansion state of identities that survive is kept; the configured
    /// initial expansion is applied on top.
    pub fn load_rows(&mut self, records: Vec<Value>) {
        self.diagnostics.reset();
        let children_field = self.children_field().map(str::to_string);
        let nodes = RowLoader::new(
            &self.config.row.key_fields,
            children_field.as_deref(),
            &mut self.next_surrogate,
        )
        .load(records, &HashSet::new(), &mut self.diagnostics);
        self.nodes = nodes;
        tracing::debug!(target: "gridview", rows = self.nodes.len(), "rows loaded");

        let live = self.live_ids();
        let pruned = self.expansion.prune(&live);
        self.measured.retain(|id, _| live.contains(id));
        if pruned > 0 {
            tracing::debug!(target: "gridview", pruned, "expansion state pruned");
        }
        self.apply_initial_expansion();
        self.mark_structure_changed();
    }

    fn apply_initial_expansion(&mut self) {
        if let Some(tree) = &self.config.tree {
            if tree.expand_all {
                self.expansion.expand_all(&self.nodes);
            }
            for key in &tree.expand_row_keys {
                self.expansion.set_expanded(&RowId::new(key.as_str()), true);
            }
        }
        if self.config.expand.enabled {
            if self.config.expand.expand_all {
                self.expansion.expand_all_details(&self.nodes);
            }
            for key in &self.config.expand.expand_row_keys {
                self.expansion.set_detail(&RowId::new(key.as_str()), true);
            }
        }
        let live = self.live_ids();
        self.expansion.prune(&live);
    }

    fn live_ids(&self) -> HashSet<RowId> {
        let mut live = HashSet::new();
        index::collect_ids(&self.nodes, &mut live);
        live
    }

    /// Insert records under `parent` (top level when `None`) before the
    /// child at `index` (appended when `None` or past the end).
    pub fn insert_rows(
        &mut self,
        records: Vec<Value>,
        parent: Option<&RowId>,
        index: Option<usize>,
    ) -> Result<Vec<RowId>> {
        let existing = self.live_ids();
        let children_field = self.children_field().map(str::to_string);
        let inserted = RowLoader::new(
            &self.config.row.key_fields,
            children_field.as_deref(),
            &mut self.next_surrogate,
        )
        .load(records, &existing, &mut self.diagnostics);
        let ids: Vec<RowId> = inserted.iter().map(|n| n.id.clone()).collect();

        let list = match parent {
            None => &mut self.nodes,
            Some(id) => {
                let path = tree::find_path(&self.nodes, id).ok_or_else(|| unknown_row(id))?;
                let last = path.last().copied().ok_or_else(|| unknown_row(id))?;
                tree::siblings_mut(&mut self.nodes, &path)
                    .and_then(|list| list.get_mut(last))
                    .map(|node| &mut node.children)
                    .ok_or_else(|| unknown_row(id))?
            }
        };
        let at = index.unwrap_or(list.len()).min(list.len());
        list.splice(at..at, inserted);
        self.mark_structure_changed();
        Ok(ids)
    }

    /// Remove rows (with their subtrees). Unknown identities are skipped.
    pub fn remove_rows(&mut self, ids: &[RowId]) -> usize {
        let mut removed = 0;
        for id in ids {
            if let Some(path) = tree::find_path(&self.nodes, id) {
                if tree::remove_at(&mut self.nodes, &path).is_some() {
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            let live = self.live_ids();
            self.expansion.prune(&live);
            self.measured.retain(|id, _| live.contains(id));
            if self.current_row.as_ref().is_some_and(|id| !live.contains(id)) {
                self.current_row = None;
            }
            self.mark_structure_changed();
        }
        removed
    }

    /// Replace the record of a row. Identity and children are unchanged.
    pub fn update_row(&mut self, id: &RowId, mut record: Value) -> Result<()> {
        if let (Some(field), Some(obj)) = (self.children_field(), record.as_object_mut()) {
            obj.remove(field);
        }
        let path = tree::find_path(&self.nodes, id).ok_or_else(|| unknown_row(id))?;
        let last = path.last().copied().ok_or_else(|| unknown_row(id))?;
        let node = tree::siblings_mut(&mut self.nodes, &path)
            .and_then(|list| list.get_mut(last))
            .ok_or_else(|| unknown_row(id))?;
        node.record = record;
        Ok(())
    }

    /// Current dataset as records, children nested back under the
    /// children field
    pub fn export_rows(&self) -> Vec<Value> {
        let field = self.children_field();
        self.nodes
            .iter()
            .map(|node| index::node_to_record(node, field))
            .collect()
    }

    /// Record of a row by identity
    pub fn record(&self, id: &RowId) -> Option<&Value> {
        self.node(id).map(|n| &n.record)
    }

    fn node(&self, id: &RowId) -> Option<&RowNode> {
        if self.built_version == self.structure_version {
            self.paths
                .get(id)
                .and_then(|path| tree::node_at(&self.nodes, path))
        } else {
            tree::find_path(&self.nodes, id).and_then(|path| tree::node_at(&self.nodes, &path))
        }
    }

    /// Flattened row sequence
    pub fn flat_rows(&mut self) -> &[FlatRow] {
        self.ensure_structure();
        &self.flat
    }

    pub fn row_index(&mut self) -> &RowIndex {
        self.ensure_structure();
        &self.row_index
    }

    /// Version bumped by every structural mutation
    pub fn structure_version(&self) -> u64 {
        self.structure_version
    }

    /// Rebuild the flattened sequence, the identity index and the row
    /// sizing if a structural mutation happened since the last build.
    fn ensure_structure(&mut self) {
        if self.built_version == self.structure_version {
            return;
        }
        let options = FlattenOptions {
            tree: self.config.tree.is_some(),
            detail: self.config.expand.enabled,
            seq_mode: self
                .config
                .tree
                .as_ref()
                .map_or(SeqMode::Default, |t| t.seq_mode),
        };
        self.flat = tree::flatten(&self.nodes, &self.expansion, options);
        self.row_index = RowIndex::build(&self.flat, self.structure_version);
        self.paths = tree::node_paths(&self.nodes);
        self.built_version = self.structure_version;
        self.rebuild_row_axis();
        self.cancel_vanished_drag();
        tracing::debug!(
            target: "gridview",
            version = self.structure_version,
            flat = self.flat.len(),
            "structure rebuilt"
        );
    }

    fn rebuild_row_axis(&mut self) {
        let detail_height = self.config.detail_height();
        let fixed = self.config.fixed_row_height();
        let uniform = fixed.filter(|h| {
            h.to_bits() == detail_height.to_bits() || !self.flat.iter().any(FlatRow::is_detail)
        });
        let axis = match uniform {
            Some(height) => AxisSizing::fixed(height, self.flat.len()),
            None => {
                let default = self.config.row.default_height;
                AxisSizing::variable(self.flat.iter().map(|row| match row {
                    FlatRow::Detail { .. } => detail_height,
                    FlatRow::Data(meta) => fixed
                        .or_else(|| self.measured.get(&meta.id).copied())
                        .unwrap_or(default),
                }))
            }
        };
        self.row_axis = axis;
        self.row_sizing_version = self.row_sizing_version.wrapping_add(1);
        self.windows_stale = true;
    }

    /// Report a measured height for an auto-height row.
    ///
    /// Ignored when rows have a fixed height. Returns `true` when the
    /// sizing changed.
    pub fn set_row_height(&mut self, id: &RowId, height: f32) -> bool {
        if self.config.fixed_row_height().is_some() || !height.is_finite() || height <= 0.0 {
            return false;
        }
        let previous = self.measured.insert(id.clone(), height);
        if previous.is_some_and(|h| h.to_bits() == height.to_bits()) {
            return false;
        }
        if self.built_version == self.structure_version {
            self.rebuild_row_axis();
        }
        true
    }

    // ========================================================================
    // Expansion
    // ========================================================================

    fn tree_node(&self, id: &RowId) -> Result<&RowNode> {
        if self.config.tree.is_none() {
            return Err(GridError::Configuration(
                "tree rows are not configured".to_string(),
            ));
        }
        self.node(id).ok_or_else(|| unknown_row(id))
    }

    /// Flip a tree row's expansion. Returns the new state; leaves stay
    /// collapsed.
    pub fn toggle_row_expand(&mut self, id: &RowId) -> Result<bool> {
        if !self.tree_node(id)?.has_children() {
            return Ok(false);
        }
        let expanded = self.expansion.toggle(id);
        self.mark_structure_changed();
        Ok(expanded)
    }

    /// Set a tree row's expansion. Returns `true` when it changed.
    pub fn set_row_expand(&mut self, id: &RowId, expanded: bool) -> Result<bool> {
        if !self.tree_node(id)?.has_children() {
            return Ok(false);
        }
        let changed = self.expansion.set_expanded(id, expanded);
        if changed {
            self.mark_structure_changed();
        }
        Ok(changed)
    }

    pub fn set_all_row_expand(&mut self, expanded: bool) {
        if self.config.tree.is_none() {
            return;
        }
        if expanded {
            self.expansion.expand_all(&self.nodes);
        } else {
            self.expansion.collapse_all();
        }
        self.mark_structure_changed();
    }

    pub fn is_row_expanded(&self, id: &RowId) -> bool {
        self.expansion.is_expanded(id)
    }

    fn detail_row(&self, id: &RowId) -> Result<()> {
        if !self.config.expand.enabled {
            return Err(GridError::Configuration(
                "row detail expansion is not enabled".to_string(),
            ));
        }
        self.node(id).map(|_| ()).ok_or_else(|| unknown_row(id))
    }

    /// Flip a row's detail slot. Returns the new state.
    pub fn toggle_row_detail(&mut self, id: &RowId) -> Result<bool> {
        self.detail_row(id)?;
        let expanded = self.expansion.toggle_detail(id);
        self.mark_structure_changed();
        Ok(expanded)
    }

    pub fn set_row_detail(&mut self, id: &RowId, expanded: bool) -> Result<bool> {
        self.detail_row(id)?;
        let changed = self.expansion.set_detail(id, expanded);
        if changed {
            self.mark_structure_changed();
        }
        Ok(changed)
    }

    pub fn set_all_row_detail(&mut self, expanded: bool) {
        if !self.config.expand.enabled {
            return;
        }
        if expanded {
            self.expansion.expand_all_details(&self.nodes);
        } else {
            self.expansion.clear_details();
        }
        self.mark_structure_changed();
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    // ========================================================================
    // Columns
    // ========================================================================

    /// Replace the column tree
    pub fn load_columns(&mut self, mut descriptors: Vec<ColumnDescriptor>) {
        index::assign_column_ids(&mut descriptors, &mut self.diagnostics);
        self.descriptors = descriptors;
        self.rebuild_columns();

        let drag = &self.config.row_drag;
        if drag.enabled
            && drag.trigger == crate::config::DragTrigger::Cell
            && !self.columns.leaves().iter().any(|c| c.drag_sort)
        {
            self.diagnostics.report(
                "rowDrag-handle",
                &GridError::Configuration(
                    "rowDrag uses the cell trigger but no column is marked dragSort".to_string(),
                ),
            );
        }
        if self
            .current_column
            .as_ref()
            .is_some_and(|id| self.columns.by_id(id).is_none())
        {
            self.current_column = None;
        }
    }

    fn rebuild_columns(&mut self) {
        self.column_version = self.column_version.wrapping_add(1);
        let mut columns = ColumnIndex::build(
            &self.descriptors,
            &self.config.column,
            self.column_version,
            &mut self.diagnostics,
        );
        columns.fit_auto_widths(self.viewport.width);
        self.columns = columns;
        self.rebuild_column_axes();
        self.cancel_vanished_drag();
    }

    fn rebuild_column_axes(&mut self) {
        let leaves = self.columns.leaves();
        self.col_axis = AxisSizing::variable(leaves.iter().map(|c| c.width));
        self.center_axis = AxisSizing::variable(
            self.columns
                .center_range()
                .filter_map(|p| leaves.get(p))
                .map(|c| c.width),
        );
        self.column_sizing_version = self.column_sizing_version.wrapping_add(1);
        self.windows_stale = true;
    }

    /// Resize one column. The width survives column reorders.
    pub fn set_column_width(&mut self, id: &ColumnId, width: f32) -> bool {
        if !width.is_finite() || !self.columns.set_width(id, width) {
            return false;
        }
        let applied = self.columns.by_id(id).map_or(width, |c| c.width);
        if let Some(path) = self.columns.descriptor_path(id).map(<[usize]>::to_vec) {
            if let Some(desc) = descriptor_mut(&mut self.descriptors, &path) {
                desc.width = Some(applied);
                desc.auto_width = false;
            }
        }
        self.rebuild_column_axes();
        true
    }

    pub fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    pub fn column_descriptors(&self) -> &[ColumnDescriptor] {
        &self.descriptors
    }

    // ========================================================================
    // Spans, footer, renderers, status
    // ========================================================================

    /// Replace the body merge list
    pub fn set_merge_spans(&mut self, spans: Vec<MergeSpan>) {
        let table = MergeTable::build(spans, "merge", &mut self.diagnostics);
        self.spans.set_table(table);
    }

    /// Replace the footer merge list
    pub fn set_footer_merge_spans(&mut self, spans: Vec<MergeSpan>) {
        let table = MergeTable::build(spans, "footer-merge", &mut self.diagnostics);
        self.footer_spans.set_table(table);
    }

    pub fn set_span_method(&mut self, method: Option<SpanMethod>) {
        self.spans.set_method(method);
    }

    pub fn set_footer_span_method(&mut self, method: Option<SpanMethod>) {
        self.footer_spans.set_method(method);
    }

    pub fn set_footer_data(&mut self, rows: Vec<Value>) {
        self.footer = rows;
    }

    pub fn footer_data(&self) -> &[Value] {
        &self.footer
    }

    /// Register a named renderer, replacing any previous one
    pub fn register_renderer(&mut self, name: impl Into<String>, renderer: Box<dyn CellRenderer>) {
        self.registry.register(name, renderer);
    }

    pub fn set_current_row(&mut self, id: Option<RowId>) {
        self.current_row = id;
    }

    pub fn set_current_column(&mut self, id: Option<ColumnId>) {
        self.current_column = id;
    }

    // ========================================================================
    // Flush and render
    // ========================================================================

    /// Queue a callback for after the next flush
    pub fn after_render(&mut self, callback: AfterRender) {
        self.tasks.after_render(callback);
    }

    /// Run deferred work: rebuild structure, recompute windows once for the
    /// newest scroll ticket, then run the queued after-render callbacks.
    pub fn flush(&mut self) -> FlushReport {
        self.ensure_structure();
        let (ticket, coalesced, callbacks) = self.tasks.begin_flush();
        let mut report = FlushReport {
            coalesced,
            ..FlushReport::default()
        };
        if ticket.is_some() || self.windows_stale {
            self.recompute_windows();
            report.recomputed = Some(ticket.unwrap_or_else(|| self.tasks.ticket()));
        }
        let snapshot = WindowSnapshot {
            ticket: self.tasks.ticket(),
            rows: self.row_window.materialized(),
            columns: self.column_window.materialized(),
        };
        report.callbacks_run = callbacks.len();
        for callback in callbacks {
            callback(&snapshot);
        }
        report
    }

    /// Window over the flattened rows as of the last flush
    pub fn row_window(&self) -> WindowState {
        self.row_window
    }

    /// Window over the scrollable columns as of the last flush
    pub fn column_window(&self) -> WindowState {
        self.column_window
    }

    /// Compose every pane for the current state
    pub fn render(&mut self, status: &dyn CellStatusSource) -> RenderPass {
        self.flush();

        let widths = pane_widths(&self.columns);
        let center = self.columns.center_range();
        let cols = offset_range(&self.column_window.materialized(), center.start, &center);
        let (rows, cols) = self
            .spans
            .extend_window(self.row_window.materialized(), cols);
        // Fixed columns are always rendered; only the scrollable start moves
        let cols = cols.start.max(center.start)..cols.end;
        let mut center_window = self.column_window;
        center_window.start = cols.start.saturating_sub(center.start);

        let x_windowed = self.column_window.mode == AxisMode::Windowed;
        let y_windowed = self.row_window.mode == AxisMode::Windowed;
        let all_clipped = !self.columns.is_empty()
            && self.columns.leaves().iter().all(|c| {
                c.overflow
                    .or(self.config.cell.overflow)
                    .unwrap_or_default()
                    .is_clipped()
            });
        let has_expand_column =
            self.config.expand.enabled && self.columns.leaves().iter().any(|c| c.expand);
        let optimize = is_optimize_mode(
            x_windowed || y_windowed,
            all_clipped,
            has_expand_column,
            self.spans.has_method() || self.footer_spans.has_method(),
        );
        let body_width = self.viewport.body_width(widths.left, widths.right);
        let overflow_x = widths.center > body_width;

        let dragging = self.drag.state().map(|s| s.item.clone());
        let row_order: Vec<usize> = match &dragging {
            Some(DragItem::Row(id)) => match self.row_index.position_of(id) {
                Some(position) => self.drag.splice_window(rows.clone(), position),
                None => rows.clone().collect(),
            },
            _ => rows.clone().collect(),
        };

        let mut panes_present = Vec::with_capacity(3);
        if !self.columns.left_range().is_empty() {
            panes_present.push(Pane::Left);
        }
        panes_present.push(Pane::Main);
        if !self.columns.right_range().is_empty() {
            panes_present.push(Pane::Right);
        }

        let composer = CellComposer {
            config: &self.config,
            columns: &self.columns,
            col_axis: &self.col_axis,
            row_axis: &self.row_axis,
            spans: &self.spans,
            footer_spans: &self.footer_spans,
            status,
            registry: &self.registry,
            rows_window: rows,
            cols_window: cols.clone(),
            x_windowed,
            current_row: self.current_row.as_ref(),
            current_column: self.current_column.as_ref(),
            dragging: dragging.as_ref(),
        };

        let mut panes = Vec::with_capacity(panes_present.len());
        for pane in panes_present {
            let mut slots = pane_columns(&self.columns, &center_window, pane, optimize, overflow_x);
            if pane == Pane::Main {
                if let Some(DragItem::Column(id)) = &dragging {
                    self.splice_dragged_column(&mut slots, id, &cols);
                }
            }
            let body: Vec<RenderedRow> = row_order
                .iter()
                .filter_map(|&position| self.compose_row(&composer, position, pane, &slots))
                .collect();
            let footer = self
                .footer
                .iter()
                .enumerate()
                .map(|(i, record)| {
                    slots
                        .iter()
                        .enumerate()
                        .filter_map(|(j, slot)| {
                            composer.footer_cell(i, record, pane, *slot, j + 1 == slots.len())
                        })
                        .collect()
                })
                .collect();
            panes.push(PaneRender {
                pane,
                columns: slots,
                rows: body,
                footer,
            });
        }

        if !rows_aligned(&panes) {
            self.diagnostics
                .warn("pane-alignment", "fixed panes rendered rows out of step with the main pane");
        }

        RenderPass {
            version: self.structure_version,
            row_window: self.row_window,
            column_window: self.column_window,
            widths,
            content_height: self.row_axis.total(),
            scroll_top: self.viewport.scroll_y,
            scroll_left: self.viewport.scroll_x,
            optimize,
            panes,
        }
    }

    fn compose_row(
        &self,
        composer: &CellComposer<'_>,
        position: usize,
        pane: Pane,
        slots: &[PaneColumn],
    ) -> Option<RenderedRow> {
        let row = self.flat.get(position)?;
        let cells = match row {
            FlatRow::Data(meta) => {
                let record = self.record(&meta.id)?;
                slots
                    .iter()
                    .enumerate()
                    .filter_map(|(j, slot)| {
                        composer.body_cell(meta, record, pane, *slot, j + 1 == slots.len())
                    })
                    .collect()
            }
            FlatRow::Detail { owner, .. } => {
                let meta = self
                    .row_index
                    .position_of(owner)
                    .and_then(|p| self.flat.get(p))
                    .and_then(FlatRow::meta)?;
                let record = self.record(owner)?;
                composer
                    .detail_cell(meta, record, position, pane, slots)
                    .into_iter()
                    .collect()
            }
        };
        Some(RenderedRow {
            id: row.id().clone(),
            flat_position: position,
            y: self.row_axis.position(position),
            height: self.row_axis.size(position),
            detail: row.is_detail(),
            cells,
        })
    }
}

fn unknown_row(id: &RowId) -> GridError {
    GridError::Other(format!("unknown row {id}"))
}

/// `window` shifted by `offset` and clamped to `bounds`
fn offset_range(window: &Range<usize>, offset: usize, bounds: &Range<usize>) -> Range<usize> {
    let start = offset.saturating_add(window.start).clamp(bounds.start, bounds.end);
    let end = offset.saturating_add(window.end).clamp(start, bounds.end);
    start..end
}

fn descriptor_mut<'a>(
    descs: &'a mut [ColumnDescriptor],
    path: &[usize],
) -> Option<&'a mut ColumnDescriptor> {
    let (first, rest) = path.split_first()?;
    let mut desc = descs.get_mut(*first)?;
    for i in rest {
        desc = desc.children.get_mut(*i)?;
    }
    Some(desc)
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
    use crate::config::TreeConfig;
    use crate::render::CellStatusMap;
    use serde_json::json;

    fn engine(config: GridConfig) -> GridEngine {
        let mut engine = GridEngine::new(config).unwrap();
        engine.load_columns(vec![
            ColumnDescriptor::new("name").with_width(100.0),
            ColumnDescriptor::new("age").with_width(80.0),
        ]);
        engine
    }

    #[test]
    fn test_load_rows_assigns_surrogates() {
        let mut engine = engine(GridConfig::default());
        engine.load_rows(vec![json!({"name": "a"}), json!({"name": "b"})]);
        let rows = engine.flat_rows();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].id().is_engine_assigned());
        let exported = engine.export_rows();
        assert!(exported[0].get(index::ROW_ID_FIELD).is_some());
    }

    #[test]
    fn test_structure_rebuilt_once_per_version() {
        let mut engine = engine(GridConfig::default());
        engine.load_rows(vec![json!({"name": "a"})]);
        engine.flush();
        let version = engine.row_index().version();
        engine.flush();
        assert_eq!(engine.row_index().version(), version);
        engine.insert_rows(vec![json!({"name": "b"})], None, Some(0)).unwrap();
        assert_eq!(engine.flat_rows().len(), 2);
        assert!(engine.row_index().version() > version);
    }

    #[test]
    fn test_toggle_requires_tree_config() {
        let mut engine = engine(GridConfig::default());
        engine.load_rows(vec![json!({"name": "a"})]);
        let id = engine.flat_rows()[0].id().clone();
        assert!(matches!(
            engine.toggle_row_expand(&id),
            Err(GridError::Configuration(_))
        ));
    }

    #[test]
    fn test_tree_toggle_changes_flat_len() {
        let config = GridConfig {
            tree: Some(TreeConfig::default()),
            ..GridConfig::default()
        };
        let mut engine = engine(config);
        engine.load_rows(vec![json!({
            "name": "root",
            "children": [{"name": "c1"}, {"name": "c2"}]
        })]);
        assert_eq!(engine.flat_rows().len(), 1);
        let root = engine.flat_rows()[0].id().clone();
        assert!(engine.toggle_row_expand(&root).unwrap());
        assert_eq!(engine.flat_rows().len(), 3);
        assert!(!engine.toggle_row_expand(&root).unwrap());
        assert_eq!(engine.flat_rows().len(), 1);
    }

    #[test]
    fn test_render_lists_every_column_in_static_mode() {
        let mut engine = engine(GridConfig::default());
        engine.load_rows(vec![json!({"name": "a", "age": 1}), json!({"name": "b", "age": 2})]);
        let pass = engine.render(&CellStatusMap::default());
        let main = pass.pane(Pane::Main).unwrap();
        assert_eq!(main.rows.len(), 2);
        assert_eq!(main.rows[1].cells.len(), 2);
        assert_eq!(main.rows[1].y, engine.config().row.default_height);
    }

    #[test]
    fn test_column_width_survives_rebuild() {
        let mut engine = engine(GridConfig::default());
        let id = ColumnId::new("age");
        assert!(engine.set_column_width(&id, 150.0));
        engine.load_columns(engine.column_descriptors().to_vec());
        assert_eq!(engine.columns().by_id(&id).unwrap().width, 150.0);
    }

    #[test]
    fn test_offset_range_clamps() {
        assert_eq!(offset_range(&(0..5), 2, &(2..6)), 2..6);
        assert_eq!(offset_range(&(3..9), 2, &(2..6)), 5..6);
        assert_eq!(offset_range(&(0..0), 0, &(0..0)), 0..0);
    }
}
