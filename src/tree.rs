//! Tree / expansion flattening.
//!
//! Turns the hierarchical row forest plus expansion state into the linear
//! sequence the window calculator slices. The sequence is produced lazily
//! by [`FlattenIter`], a depth-first pre-order walk over an explicit stack,
//! so callers that only need a prefix never pay for the whole tree.

use std::collections::{HashMap, HashSet};

use crate::config::SeqMode;
use crate::types::{FlatRow, RowId, RowMeta, RowNode, Seq};

/// Expansion state keyed by row identity.
///
/// Tree expansion and detail-row expansion are tracked separately; both
/// survive re-flattening and reloads as long as identities are stable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExpansionState {
    tree: HashSet<RowId>,
    detail: HashSet<RowId>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, id: &RowId) -> bool {
        self.tree.contains(id)
    }

    pub fn is_detail_expanded(&self, id: &RowId) -> bool {
        self.detail.contains(id)
    }

    /// Set tree expansion. Returns `true` when the state changed.
    pub fn set_expanded(&mut self, id: &RowId, expanded: bool) -> bool {
        if expanded {
            self.tree.insert(id.clone())
        } else {
            self.tree.remove(id)
        }
    }

    /// Flip tree expansion, returning the new state.
    pub fn toggle(&mut self, id: &RowId) -> bool {
        let expanded = !self.is_expanded(id);
        self.set_expanded(id, expanded);
        expanded
    }

    /// Set detail-row expansion. Returns `true` when the state changed.
    pub fn set_detail(&mut self, id: &RowId, expanded: bool) -> bool {
        if expanded {
            self.detail.insert(id.clone())
        } else {
            self.detail.remove(id)
        }
    }

    pub fn toggle_detail(&mut self, id: &RowId) -> bool {
        let expanded = !self.is_detail_expanded(id);
        self.set_detail(id, expanded);
        expanded
    }

    /// Expand every node that has children.
    pub fn expand_all(&mut self, nodes: &[RowNode]) {
        let mut stack: Vec<&RowNode> = nodes.iter().collect();
        while let Some(node) = stack.pop() {
            if node.has_children() {
                self.tree.insert(node.id.clone());
                stack.extend(node.children.iter());
            }
        }
    }

    /// Open a detail slot under every top-level row.
    pub fn expand_all_details(&mut self, nodes: &[RowNode]) {
        self.detail.extend(nodes.iter().map(|n| n.id.clone()));
    }

    pub fn collapse_all(&mut self) {
        self.tree.clear();
    }

    pub fn clear_details(&mut self) {
        self.detail.clear();
    }

    /// Forget identities that are no longer in the dataset.
    pub fn prune(&mut self, live: &HashSet<RowId>) -> usize {
        let before = self.tree.len() + self.detail.len();
        self.tree.retain(|id| live.contains(id));
        self.detail.retain(|id| live.contains(id));
        before - self.tree.len() - self.detail.len()
    }
}

/// What the flattener contributes besides plain rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Expanded nodes contribute their children
    pub tree: bool,
    /// Detail-expanded rows get a synthetic slot after them
    pub detail: bool,
    pub seq_mode: SeqMode,
}

struct Frame<'a> {
    siblings: &'a [RowNode],
    next: usize,
    depth: usize,
    parent: Option<&'a RowId>,
}

/// Lazy depth-first pre-order flattening.
pub struct FlattenIter<'a> {
    stack: Vec<Frame<'a>>,
    expansion: &'a ExpansionState,
    options: FlattenOptions,
    flat_position: usize,
    data_index: usize,
    pending_detail: Option<(&'a RowId, usize)>,
}

impl<'a> FlattenIter<'a> {
    pub fn new(nodes: &'a [RowNode], expansion: &'a ExpansionState, options: FlattenOptions) -> Self {
        Self {
            stack: vec![Frame {
                siblings: nodes,
                next: 0,
                depth: 0,
                parent: None,
            }],
            expansion,
            options,
            flat_position: 0,
            data_index: 0,
            pending_detail: None,
        }
    }
}

impl<'a> Iterator for FlattenIter<'a> {
    type Item = FlatRow;

    fn next(&mut self) -> Option<FlatRow> {
        if let Some((owner, depth)) = self.pending_detail.take() {
            let row = FlatRow::Detail {
                owner: owner.clone(),
                depth,
                flat_position: self.flat_position,
            };
            self.flat_position += 1;
            return Some(row);
        }

        loop {
            let frame = self.stack.last_mut()?;
            let siblings: &'a [RowNode] = frame.siblings;
            let Some(node) = siblings.get(frame.next) else {
                self.stack.pop();
                continue;
            };
            let sibling_index = frame.next;
            frame.next += 1;
            let depth = frame.depth;
            let parent = frame.parent;

            let seq = match self.options.seq_mode {
                SeqMode::Increasing => Seq::Index(self.data_index + 1),
                // Each frame's cursor already sits one past the node being
                // visited at that level, i.e. the 1-based ordinal
                SeqMode::Default => Seq::Path(self.stack.iter().map(|f| f.next).collect()),
            };
            let top_level_index = self
                .stack
                .first()
                .map_or(0, |f| f.next.saturating_sub(1));

            let tree_expanded =
                self.options.tree && node.has_children() && self.expansion.is_expanded(&node.id);
            let detail_expanded =
                self.options.detail && self.expansion.is_detail_expanded(&node.id);

            let meta = RowMeta {
                id: node.id.clone(),
                depth,
                parent: parent.cloned(),
                flat_position: self.flat_position,
                data_index: self.data_index,
                sibling_index,
                top_level_index,
                is_expanded: if self.options.tree {
                    tree_expanded
                } else {
                    detail_expanded
                },
                has_children: self.options.tree && node.has_children(),
                seq,
            };
            self.flat_position += 1;
            self.data_index += 1;

            if detail_expanded {
                self.pending_detail = Some((&node.id, depth));
            }
            if tree_expanded {
                self.stack.push(Frame {
                    siblings: &node.children,
                    next: 0,
                    depth: depth + 1,
                    parent: Some(&node.id),
                });
            }
            return Some(FlatRow::Data(meta));
        }
    }
}

/// Flatten the whole forest.
pub fn flatten(nodes: &[RowNode], expansion: &ExpansionState, options: FlattenOptions) -> Vec<FlatRow> {
    FlattenIter::new(nodes, expansion, options).collect()
}

/// Index path of a node in the forest
pub fn find_path(nodes: &[RowNode], id: &RowId) -> Option<Vec<usize>> {
    let mut stack: Vec<(&[RowNode], usize)> = vec![(nodes, 0)];
    let mut path: Vec<usize> = Vec::new();
    while let Some((siblings, i)) = stack.pop() {
        path.truncate(stack.len());
        let Some(node) = siblings.get(i) else {
            continue;
        };
        stack.push((siblings, i + 1));
        path.push(i);
        if &node.id == id {
            return Some(path);
        }
        if node.has_children() {
            stack.push((&node.children, 0));
        }
    }
    None
}

/// Index path of every node in the forest, collapsed subtrees included
pub fn node_paths(nodes: &[RowNode]) -> HashMap<RowId, Vec<usize>> {
    let mut out = HashMap::new();
    let mut stack: Vec<(&[RowNode], usize)> = vec![(nodes, 0)];
    let mut path: Vec<usize> = Vec::new();
    while let Some((siblings, i)) = stack.pop() {
        path.truncate(stack.len());
        let Some(node) = siblings.get(i) else {
            continue;
        };
        stack.push((siblings, i + 1));
        path.push(i);
        out.insert(node.id.clone(), path.clone());
        if node.has_children() {
            stack.push((&node.children, 0));
        }
    }
    out
}

/// Node at an index path
pub fn node_at<'a>(nodes: &'a [RowNode], path: &[usize]) -> Option<&'a RowNode> {
    let (first, rest) = path.split_first()?;
    let mut node = nodes.get(*first)?;
    for i in rest {
        node = node.children.get(*i)?;
    }
    Some(node)
}

/// Sibling list containing the node at `path`
pub fn siblings_mut<'a>(nodes: &'a mut Vec<RowNode>, path: &[usize]) -> Option<&'a mut Vec<RowNode>> {
    let (_, parents) = path.split_last()?;
    let mut list = nodes;
    for i in parents {
        list = &mut list.get_mut(*i)?.children;
    }
    Some(list)
}

/// Detach the node at `path`
pub fn remove_at(nodes: &mut Vec<RowNode>, path: &[usize]) -> Option<RowNode> {
    let index = *path.last()?;
    let list = siblings_mut(nodes, path)?;
    (index < list.len()).then(|| list.remove(index))
}

/// Insert `node` at `path`; the last component is clamped to the list length.
pub fn insert_at(nodes: &mut Vec<RowNode>, path: &[usize], node: RowNode) -> bool {
    let Some(index) = path.last().copied() else {
        return false;
    };
    let Some(list) = siblings_mut(nodes, path) else {
        return false;
    };
    let index = index.min(list.len());
    list.insert(index, node);
    true
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
    use serde_json::Value;

    fn node(id: &str, children: Vec<RowNode>) -> RowNode {
        RowNode {
            id: RowId::new(id),
            record: Value::Null,
            children,
        }
    }

    fn sample() -> Vec<RowNode> {
        vec![
            node(
                "R",
                vec![node("A", vec![node("A1", vec![]), node("A2", vec![])]), node("B", vec![])],
            ),
            node("S", vec![]),
        ]
    }

    fn tree_opts() -> FlattenOptions {
        FlattenOptions {
            tree: true,
            ..FlattenOptions::default()
        }
    }

    fn ids(rows: &[FlatRow]) -> Vec<&str> {
        rows.iter().map(|r| r.id().as_str()).collect()
    }

    #[test]
    fn test_collapsed_hides_children() {
        let nodes = sample();
        let state = ExpansionState::new();
        assert_eq!(ids(&flatten(&nodes, &state, tree_opts())), ["R", "S"]);
    }

    #[test]
    fn test_preorder_with_expansion() {
        let nodes = sample();
        let mut state = ExpansionState::new();
        state.set_expanded(&RowId::new("R"), true);
        state.set_expanded(&RowId::new("A"), true);
        let rows = flatten(&nodes, &state, tree_opts());
        assert_eq!(ids(&rows), ["R", "A", "A1", "A2", "B", "S"]);
        let a2 = rows[3].meta().unwrap();
        assert_eq!(a2.depth, 2);
        assert_eq!(a2.parent, Some(RowId::new("A")));
        assert_eq!(a2.sibling_index, 1);
        assert_eq!(a2.seq.to_string(), "1.1.2");
        assert_eq!(rows[5].meta().unwrap().seq.to_string(), "2");
    }

    #[test]
    fn test_increasing_seq() {
        let nodes = sample();
        let mut state = ExpansionState::new();
        state.expand_all(&nodes);
        let opts = FlattenOptions {
            tree: true,
            seq_mode: SeqMode::Increasing,
            ..FlattenOptions::default()
        };
        let rows = flatten(&nodes, &state, opts);
        let seqs: Vec<String> = rows
            .iter()
            .filter_map(FlatRow::meta)
            .map(|m| m.seq.to_string())
            .collect();
        assert_eq!(seqs, ["1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn test_detail_slot_counted_in_flat_positions() {
        let nodes = vec![node("a", vec![]), node("b", vec![])];
        let mut state = ExpansionState::new();
        state.set_detail(&RowId::new("a"), true);
        let opts = FlattenOptions {
            detail: true,
            ..FlattenOptions::default()
        };
        let rows = flatten(&nodes, &state, opts);
        assert_eq!(rows.len(), 3);
        assert!(rows[1].is_detail());
        let b = rows[2].meta().unwrap();
        assert_eq!(b.flat_position, 2);
        assert_eq!(b.data_index, 1);
    }

    #[test]
    fn test_lazy_prefix() {
        let nodes = sample();
        let mut state = ExpansionState::new();
        state.expand_all(&nodes);
        let first: Vec<FlatRow> = FlattenIter::new(&nodes, &state, tree_opts()).take(2).collect();
        assert_eq!(ids(&first), ["R", "A"]);
    }

    #[test]
    fn test_prune_forgets_missing_ids() {
        let mut state = ExpansionState::new();
        state.set_expanded(&RowId::new("x"), true);
        state.set_detail(&RowId::new("y"), true);
        let live: HashSet<RowId> = [RowId::new("y")].into_iter().collect();
        assert_eq!(state.prune(&live), 1);
        assert!(state.is_detail_expanded(&RowId::new("y")));
    }

    #[test]
    fn test_path_helpers() {
        let mut nodes = sample();
        let path = find_path(&nodes, &RowId::new("A2")).unwrap();
        assert_eq!(path, vec![0, 0, 1]);
        assert_eq!(node_at(&nodes, &path).unwrap().id.as_str(), "A2");
        assert_eq!(find_path(&nodes, &RowId::new("S")), Some(vec![1]));
        assert_eq!(find_path(&nodes, &RowId::new("nope")), None);

        let moved = remove_at(&mut nodes, &path).unwrap();
        assert!(insert_at(&mut nodes, &[0], moved));
        assert_eq!(nodes[0].id.as_str(), "A2");
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn test_node_paths_cover_collapsed_nodes() {
        let nodes = sample();
        let paths = node_paths(&nodes);
        assert_eq!(paths.len(), 6);
        assert_eq!(paths[&RowId::new("A2")], vec![0, 0, 1]);
        assert_eq!(paths[&RowId::new("B")], vec![0, 1]);
        assert_eq!(paths[&RowId::new("S")], vec![1]);
    }
}
