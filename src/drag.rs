//! Drag-reorder splicing.
//!
//! While a drag is in flight the dataset is untouched: the splicer only
//! rewrites the order in which the materialized slice is rendered. The
//! dataset changes on drop, after the drop passes the configured
//! peer / cross-level rules; a rejected drop leaves everything as it was.

use std::ops::Range;

use serde::Serialize;

use crate::config::DragConfig;
use crate::error::{GridError, Result};
use crate::tree;
use crate::types::{ColumnDescriptor, ColumnId, RowId, RowNode};

/// What is being dragged
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum DragItem {
    Row(RowId),
    Column(ColumnId),
}

/// Which side of the target the item lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DropSide {
    Before,
    After,
}

/// Pointer-implied insertion point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTarget {
    /// Flat row position or leaf column position, clamped to the window
    pub position: usize,
    pub side: DropSide,
}

/// Transient state of an in-flight drag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragState {
    pub item: DragItem,
    /// Pointer position in content coordinates
    pub pointer: (f32, f32),
    /// Position of the item when the drag started
    pub origin: usize,
    pub target: Option<DropTarget>,
}

/// Owner of the drag state
#[derive(Debug, Clone, Default)]
pub struct DragSplicer {
    state: Option<DragState>,
}

impl DragSplicer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<&DragState> {
        self.state.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.state.is_some()
    }

    /// Begin dragging `item`, currently at `origin`.
    pub fn start(&mut self, item: DragItem, origin: usize, pointer: (f32, f32)) -> Result<()> {
        if let Some(current) = &self.state {
            return Err(GridError::DragRejected(format!(
                "a drag of {:?} is already in progress",
                current.item
            )));
        }
        tracing::debug!(target: "gridview", ?item, origin, "drag start");
        self.state = Some(DragState {
            item,
            pointer,
            origin,
            target: None,
        });
        Ok(())
    }

    /// Pointer moved over the item at `hover`.
    ///
    /// Insertion points outside `window` clamp to its nearest boundary.
    /// Moving down lands after the hovered item, moving up before it.
    pub fn move_to(&mut self, pointer: (f32, f32), hover: usize, window: &Range<usize>) -> Option<DropTarget> {
        let state = self.state.as_mut()?;
        state.pointer = pointer;
        if window.is_empty() {
            state.target = None;
            return None;
        }
        let position = hover.clamp(window.start, window.end - 1);
        let side = if position > state.origin {
            DropSide::After
        } else {
            DropSide::Before
        };
        let target = DropTarget { position, side };
        state.target = Some(target);
        Some(target)
    }

    /// Abandon the drag. The dataset was never touched.
    pub fn cancel(&mut self) -> Option<DragState> {
        let state = self.state.take();
        if let Some(state) = &state {
            tracing::debug!(target: "gridview", item = ?state.item, "drag cancelled");
        }
        state
    }

    /// End the drag, handing back the state for the drop to apply.
    pub fn finish(&mut self) -> Option<DragState> {
        self.state.take()
    }

    /// Render order of the materialized `window` while dragging the item
    /// at `dragged`.
    ///
    /// The item is removed from its slot and reinserted at the drop
    /// target. An item outside the window that has no target yet is
    /// prepended or appended so it stays rendered.
    pub fn splice_window(&self, window: Range<usize>, dragged: usize) -> Vec<usize> {
        let target = self.state.as_ref().and_then(|s| s.target);
        splice_window(window, dragged, target)
    }
}

/// Order of `window` with `dragged` moved to `target`
pub fn splice_window(window: Range<usize>, dragged: usize, target: Option<DropTarget>) -> Vec<usize> {
    if window.is_empty() {
        return Vec::new();
    }
    let mut order: Vec<usize> = window.clone().filter(|p| *p != dragged).collect();
    let at = match target {
        Some(t) if t.position != dragged => {
            let position = t.position.clamp(window.start, window.end - 1);
            let idx = order.partition_point(|p| *p < position);
            match t.side {
                DropSide::Before => idx,
                DropSide::After => (idx + 1).min(order.len()),
            }
        }
        _ => order.partition_point(|p| *p < dragged),
    };
    order.insert(at, dragged);
    order
}

/// Check a row drop against the drag rules.
///
/// `from` and `to` are index paths in the row forest. Peer-only drops stay
/// under the same parent; cross-level drops may change parent but never
/// into the dragged subtree; with neither enabled, only top-level rows
/// move.
pub fn check_row_drop(config: &DragConfig, from: &[usize], to: &[usize]) -> Result<()> {
    let from_parent = from.split_last().map(|(_, p)| p);
    let to_parent = to.split_last().map(|(_, p)| p);
    if to.starts_with(from) {
        return Err(GridError::DragRejected(
            "cannot drop a row into its own subtree".to_string(),
        ));
    }
    if config.cross_level {
        return Ok(());
    }
    if config.peer_only {
        return if from_parent == to_parent {
            Ok(())
        } else {
            Err(GridError::DragRejected(
                "rows may only move among their siblings".to_string(),
            ))
        };
    }
    if from.len() == 1 && to.len() == 1 {
        Ok(())
    } else {
        Err(GridError::DragRejected(
            "only top-level rows can be reordered".to_string(),
        ))
    }
}

/// Move row `dragged` next to row `target` in the forest.
pub fn apply_row_drop(
    nodes: &mut Vec<RowNode>,
    config: &DragConfig,
    dragged: &RowId,
    target: &RowId,
    side: DropSide,
) -> Result<()> {
    if dragged == target {
        return Ok(());
    }
    let from = tree::find_path(nodes, dragged)
        .ok_or_else(|| GridError::DragRejected(format!("row {dragged} no longer exists")))?;
    let to = tree::find_path(nodes, target)
        .ok_or_else(|| GridError::DragRejected(format!("row {target} no longer exists")))?;
    check_row_drop(config, &from, &to)?;

    let node = tree::remove_at(nodes, &from)
        .ok_or_else(|| GridError::DragRejected(format!("row {dragged} no longer exists")))?;
    // Removal may shift the target's path
    let Some(mut to) = tree::find_path(nodes, target) else {
        // Unreachable after the subtree check; restore and reject
        tree::insert_at(nodes, &from, node);
        return Err(GridError::DragRejected(format!("row {target} no longer exists")));
    };
    if side == DropSide::After {
        if let Some(last) = to.last_mut() {
            *last += 1;
        }
    }
    tree::insert_at(nodes, &to, node);
    Ok(())
}

/// Check a column drop. Fixed sides never mix; changing group needs
/// cross-level drags.
pub fn check_column_drop(
    config: &DragConfig,
    from: &[usize],
    to: &[usize],
    same_side: bool,
) -> Result<()> {
    if !same_side {
        return Err(GridError::DragRejected(
            "columns cannot move between fixed panes".to_string(),
        ));
    }
    let from_parent = from.split_last().map(|(_, p)| p);
    let to_parent = to.split_last().map(|(_, p)| p);
    if from_parent != to_parent && !config.cross_level {
        return Err(GridError::DragRejected(
            "columns may only move within their group".to_string(),
        ));
    }
    Ok(())
}

fn descriptors_at<'a>(
    descs: &'a mut Vec<ColumnDescriptor>,
    path: &[usize],
) -> Option<&'a mut Vec<ColumnDescriptor>> {
    let (_, parents) = path.split_last()?;
    let mut list = descs;
    for i in parents {
        list = &mut list.get_mut(*i)?.children;
    }
    Some(list)
}

/// Step `path` back one slot if it runs through the list `removed` was
/// taken from, past the removed entry.
fn shift_past_removal(path: &mut [usize], removed: &[usize]) {
    let Some((&index, parents)) = removed.split_last() else {
        return;
    };
    let depth = parents.len();
    if path.len() > depth && path.get(..depth) == Some(parents) {
        if let Some(slot) = path.get_mut(depth) {
            if *slot > index {
                *slot -= 1;
            }
        }
    }
}

/// Move the descriptor at `from` next to the one at `to`.
///
/// Groups emptied by the move are removed with it.
pub fn apply_column_drop(
    descs: &mut Vec<ColumnDescriptor>,
    from: &[usize],
    to: &[usize],
    side: DropSide,
) -> Result<()> {
    if from == to {
        return Ok(());
    }
    let missing = || GridError::DragRejected("column no longer exists".to_string());
    let (&index, mut emptied) = from.split_last().ok_or_else(missing)?;
    let list = descriptors_at(descs, from).ok_or_else(missing)?;
    if index >= list.len() {
        return Err(missing());
    }
    let desc = list.remove(index);
    let mut to = to.to_vec();
    shift_past_removal(&mut to, from);

    // A group left without columns goes too
    while let Some((&slot, parents)) = emptied.split_last() {
        let list = descriptors_at(descs, emptied).ok_or_else(missing)?;
        if !list.get(slot).is_some_and(|group| group.children.is_empty()) {
            break;
        }
        list.remove(slot);
        shift_past_removal(&mut to, emptied);
        emptied = parents;
    }

    if side == DropSide::After {
        if let Some(last) = to.last_mut() {
            *last += 1;
        }
    }
    let at = *to.last().ok_or_else(missing)?;
    let list = descriptors_at(descs, &to).ok_or_else(missing)?;
    let at = at.min(list.len());
    list.insert(at, desc);
    Ok(())
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
    use serde_json::Value;

    fn node(id: &str, children: Vec<RowNode>) -> RowNode {
        RowNode {
            id: RowId::new(id),
            record: Value::Null,
            children,
        }
    }

    fn ids(nodes: &[RowNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_single_drag_at_a_time() {
        let mut s = DragSplicer::new();
        s.start(DragItem::Row(RowId::new("a")), 3, (0.0, 0.0)).unwrap();
        assert!(matches!(
            s.start(DragItem::Row(RowId::new("b")), 4, (0.0, 0.0)),
            Err(GridError::DragRejected(_))
        ));
        assert!(s.cancel().is_some());
        assert!(!s.is_dragging());
    }

    #[test]
    fn test_target_clamped_to_window() {
        let mut s = DragSplicer::new();
        s.start(DragItem::Row(RowId::new("a")), 12, (0.0, 0.0)).unwrap();
        let t = s.move_to((0.0, 900.0), 50, &(10..20)).unwrap();
        assert_eq!(t, DropTarget { position: 19, side: DropSide::After });
        let t = s.move_to((0.0, 0.0), 2, &(10..20)).unwrap();
        assert_eq!(t, DropTarget { position: 10, side: DropSide::Before });
    }

    #[test]
    fn test_splice_moves_within_window() {
        let target = DropTarget { position: 5, side: DropSide::After };
        assert_eq!(splice_window(2..7, 3, Some(target)), [2, 4, 5, 3, 6]);
        let target = DropTarget { position: 2, side: DropSide::Before };
        assert_eq!(splice_window(2..7, 5, Some(target)), [5, 2, 3, 4, 6]);
        // No target yet: the item stays in its slot
        assert_eq!(splice_window(2..7, 4, None), [2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_splice_keeps_outside_item_rendered() {
        assert_eq!(splice_window(10..13, 2, None), [2, 10, 11, 12]);
        assert_eq!(splice_window(10..13, 40, None), [10, 11, 12, 40]);
    }

    #[test]
    fn test_row_drop_top_level() {
        let mut nodes = vec![node("a", vec![]), node("b", vec![]), node("c", vec![])];
        apply_row_drop(&mut nodes, &DragConfig::default(), &RowId::new("a"), &RowId::new("c"), DropSide::After)
            .unwrap();
        assert_eq!(ids(&nodes), ["b", "c", "a"]);
        apply_row_drop(&mut nodes, &DragConfig::default(), &RowId::new("a"), &RowId::new("b"), DropSide::Before)
            .unwrap();
        assert_eq!(ids(&nodes), ["a", "b", "c"]);
    }

    #[test]
    fn test_row_drop_rules() {
        let base = vec![
            node("r", vec![node("x", vec![]), node("y", vec![])]),
            node("s", vec![node("z", vec![])]),
        ];
        let peer = DragConfig {
            enabled: true,
            peer_only: true,
            ..DragConfig::default()
        };
        let mut nodes = base.clone();
        apply_row_drop(&mut nodes, &peer, &RowId::new("x"), &RowId::new("y"), DropSide::After).unwrap();
        assert_eq!(ids(&nodes[0].children), ["y", "x"]);

        let mut nodes = base.clone();
        let err = apply_row_drop(&mut nodes, &peer, &RowId::new("x"), &RowId::new("z"), DropSide::Before);
        assert!(matches!(err, Err(GridError::DragRejected(_))));
        assert_eq!(nodes, base);

        let cross = DragConfig {
            enabled: true,
            cross_level: true,
            ..DragConfig::default()
        };
        let mut nodes = base.clone();
        apply_row_drop(&mut nodes, &cross, &RowId::new("x"), &RowId::new("z"), DropSide::Before).unwrap();
        assert_eq!(ids(&nodes[1].children), ["x", "z"]);

        let mut nodes = base.clone();
        let err = apply_row_drop(&mut nodes, &cross, &RowId::new("r"), &RowId::new("y"), DropSide::Before);
        assert!(err.is_err());
        assert_eq!(nodes, base);
    }

    #[test]
    fn test_column_drop_within_group() {
        let mut cols = vec![
            ColumnDescriptor::new("a"),
            ColumnDescriptor::new("b"),
            ColumnDescriptor::new("c"),
        ];
        apply_column_drop(&mut cols, &[0], &[2], DropSide::After).unwrap();
        let fields: Vec<&str> = cols.iter().map(|c| c.field.as_deref().unwrap()).collect();
        assert_eq!(fields, ["b", "c", "a"]);

        assert!(check_column_drop(&DragConfig::default(), &[0, 1], &[1, 0], true).is_err());
        assert!(check_column_drop(&DragConfig::default(), &[0], &[1], false).is_err());
        assert!(check_column_drop(&DragConfig::default(), &[0, 1], &[0, 0], true).is_ok());
    }

    #[test]
    fn test_column_drop_prunes_emptied_groups() {
        let inner = ColumnDescriptor::default().with_children(vec![ColumnDescriptor::new("c")]);
        let outer = ColumnDescriptor::default().with_children(vec![inner]);
        let mut cols = vec![ColumnDescriptor::new("a"), outer, ColumnDescriptor::new("d")];
        apply_column_drop(&mut cols, &[1, 0, 0], &[2], DropSide::After).unwrap();
        let fields: Vec<&str> = cols.iter().map(|c| c.field.as_deref().unwrap()).collect();
        assert_eq!(fields, ["a", "d", "c"]);
    }

    #[test]
    fn test_column_drop_keeps_group_with_remaining_children() {
        let group = ColumnDescriptor::default()
            .with_children(vec![ColumnDescriptor::new("b"), ColumnDescriptor::new("c")]);
        let mut cols = vec![ColumnDescriptor::new("a"), group];
        apply_column_drop(&mut cols, &[1, 0], &[0], DropSide::Before).unwrap();
        assert_eq!(cols.len(), 3);
        assert_eq!(cols[0].field.as_deref(), Some("b"));
        assert_eq!(cols[2].children.len(), 1);
    }
}
