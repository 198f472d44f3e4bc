//! Tree and detail flattening tests
//!
//! Tests for the flattened row sequence: tree expansion, detail slots,
//! sequence numbers and the identity index built over it.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;
mod fixtures;

use common::*;
use gridview::config::SeqMode;
use gridview::tree::{flatten, ExpansionState, FlattenOptions};
use gridview::{FlatRow, GridError, RowNode, Seq};
use proptest::prelude::*;
use serde_json::json;
use test_case::test_case;

fn leaf(id: &str) -> RowNode {
    RowNode {
        id: rid(id),
        record: json!({ "id": id }),
        children: Vec::new(),
    }
}

fn branch(id: &str, children: Vec<RowNode>) -> RowNode {
    RowNode {
        children,
        ..leaf(id)
    }
}

fn tree_options() -> FlattenOptions {
    FlattenOptions {
        tree: true,
        ..FlattenOptions::default()
    }
}

fn row_ids(rows: &[FlatRow]) -> Vec<String> {
    ids(rows.iter().map(FlatRow::id))
}

// ============================================================================
// Tree Expansion
// ============================================================================

/// R expanded, A collapsed: A's children stay hidden until A expands.
#[test]
fn test_scenario_c() {
    let mut engine = GridBuilder::new()
        .tree(&["R"])
        .rows(family_tree())
        .build();
    assert_eq!(flat_ids(&mut engine), ["R", "A", "B"]);

    assert!(engine.toggle_row_expand(&rid("A")).unwrap());
    assert_eq!(flat_ids(&mut engine), ["R", "A", "A.c1", "A.c2", "B"]);
}

#[test]
fn test_collapsed_root_hides_everything_below() {
    let mut engine = GridBuilder::new().tree(&[]).rows(family_tree()).build();
    assert_eq!(flat_ids(&mut engine), ["R"]);
    engine.set_all_row_expand(true);
    assert_eq!(flat_ids(&mut engine), ["R", "A", "A.c1", "A.c2", "B"]);
    engine.set_all_row_expand(false);
    assert_eq!(flat_ids(&mut engine), ["R"]);
}

#[test]
fn test_depth_and_parent() {
    let mut engine = GridBuilder::new()
        .tree(&["R", "A"])
        .rows(family_tree())
        .build();
    let rows = engine.flat_rows();
    let meta = rows[2].meta().unwrap();
    assert_eq!(meta.id.as_str(), "A.c1");
    assert_eq!(meta.depth, 2);
    assert_eq!(meta.parent.as_ref().unwrap().as_str(), "A");
    assert_eq!(meta.sibling_index, 0);
    assert_eq!(meta.top_level_index, 0);
    assert!(rows[1].meta().unwrap().has_children);
    assert!(rows[1].meta().unwrap().is_expanded);
}

#[test]
fn test_leaf_toggle_is_noop() {
    let mut engine = GridBuilder::new()
        .tree(&["R"])
        .rows(family_tree())
        .build();
    let version = engine.structure_version();
    assert!(!engine.toggle_row_expand(&rid("B")).unwrap());
    assert_eq!(engine.structure_version(), version);
}

#[test]
fn test_unknown_row_toggle_errors() {
    let mut engine = GridBuilder::new().tree(&[]).rows(family_tree()).build();
    assert!(matches!(
        engine.toggle_row_expand(&rid("missing")),
        Err(GridError::Other(_))
    ));
}

#[test]
fn test_expansion_survives_reload() {
    let mut engine = GridBuilder::new().tree(&["R"]).rows(family_tree()).build();
    engine.toggle_row_expand(&rid("A")).unwrap();
    engine.load_rows(family_tree());
    assert!(engine.is_row_expanded(&rid("A")));

    // Identities that vanish are pruned from the expansion state
    engine.load_rows(vec![node("R", vec![node("B", vec![])])]);
    assert!(!engine.is_row_expanded(&rid("A")));
}

// ============================================================================
// Detail Rows
// ============================================================================

#[test]
fn test_detail_slot_follows_owner() {
    let mut engine = GridBuilder::new()
        .row_height(24.0)
        .detail(120.0)
        .rows(flat_records(3))
        .build();
    assert!(engine.toggle_row_detail(&rid("1")).unwrap());
    assert_eq!(flat_ids(&mut engine), ["0", "1", "1:detail", "2"]);

    let pass = render(&mut engine);
    assert_eq!(pass.content_height, 24.0 * 3.0 + 120.0);
    let main = pass.pane(gridview::layout::Pane::Main).unwrap();
    let detail = &main.rows[2];
    assert!(detail.detail);
    assert_eq!(detail.height, 120.0);
    assert_eq!(detail.cells.len(), 1);
    assert!(detail.cells[0].params.flags.detail);
}

#[test]
fn test_detail_requires_expand_config() {
    let mut engine = GridBuilder::new().rows(flat_records(3)).build();
    assert!(matches!(
        engine.toggle_row_detail(&rid("1")),
        Err(GridError::Configuration(_))
    ));
}

#[test]
fn test_detail_keeps_data_index() {
    let nodes = vec![leaf("a"), leaf("b")];
    let mut expansion = ExpansionState::new();
    expansion.set_detail(&rid("a"), true);
    let rows = flatten(
        &nodes,
        &expansion,
        FlattenOptions {
            detail: true,
            ..FlattenOptions::default()
        },
    );
    assert_eq!(rows.len(), 3);
    assert!(rows[1].is_detail());
    assert_eq!(rows[2].meta().unwrap().data_index, 1);
    assert_eq!(rows[2].flat_position(), 2);
}

// ============================================================================
// Sequence Numbers
// ============================================================================

#[test_case(SeqMode::Default, "1.1.2" ; "dotted path")]
#[test_case(SeqMode::Increasing, "4" ; "positional")]
fn test_seq_modes(mode: SeqMode, expected: &str) {
    let nodes = vec![branch(
        "R",
        vec![branch("A", vec![leaf("A.c1"), leaf("A.c2")]), leaf("B")],
    )];
    let mut expansion = ExpansionState::new();
    expansion.expand_all(&nodes);
    let rows = flatten(
        &nodes,
        &expansion,
        FlattenOptions {
            seq_mode: mode,
            ..tree_options()
        },
    );
    let meta = rows[3].meta().unwrap();
    assert_eq!(meta.id.as_str(), "A.c2");
    assert_eq!(meta.seq.to_string(), expected);
}

#[test]
fn test_top_level_seq_counts_roots() {
    let nodes = vec![branch("R", vec![leaf("A")]), leaf("S")];
    let rows = flatten(&nodes, &ExpansionState::new(), tree_options());
    assert_eq!(rows[1].meta().unwrap().seq, Seq::Path(vec![2]));
}

// ============================================================================
// Identity Index
// ============================================================================

#[test]
fn test_row_index_tracks_positions() {
    let mut engine = GridBuilder::new().tree(&["R"]).rows(family_tree()).build();
    assert_eq!(engine.row_index().position_of(&rid("B")), Some(2));
    engine.toggle_row_expand(&rid("A")).unwrap();
    assert_eq!(engine.row_index().position_of(&rid("B")), Some(4));
    assert!(!engine.row_index().contains(&rid("missing")));
}

#[test]
fn test_duplicate_keys_fall_back_to_positions() {
    let mut engine = GridBuilder::new()
        .rows(vec![json!({"id": 1}), json!({"id": 1}), json!({"id": 2})])
        .build();
    let ids = flat_ids(&mut engine);
    assert_eq!(ids.len(), 3);
    assert_ne!(ids[0], ids[1]);
    assert_eq!(ids[2], "2");
    let diagnostics = engine.take_diagnostics();
    assert!(diagnostics.iter().any(|d| d.key == "identity-collision:1"));
}

// ============================================================================
// Properties
// ============================================================================

fn forest_strategy() -> impl Strategy<Value = Vec<RowNode>> {
    let leaf_node = "[a-z]{1,6}".prop_map(|s| (s, Vec::<RowNode>::new()));
    let tree = leaf_node.prop_recursive(3, 40, 4, |inner| {
        ("[a-z]{1,6}", proptest::collection::vec(inner, 0..4)).prop_map(|(s, children)| {
            (
                s,
                children
                    .into_iter()
                    .map(|(id, kids)| RowNode {
                        id: rid(&id),
                        record: json!({}),
                        children: kids,
                    })
                    .collect(),
            )
        })
    });
    proptest::collection::vec(tree, 0..6).prop_map(|roots| {
        // Unique identities by position
        let mut counter = 0usize;
        let mut nodes = Vec::with_capacity(roots.len());
        for (_, children) in roots {
            let children = relabel(children, &mut counter);
            counter += 1;
            nodes.push(RowNode {
                id: rid(&format!("n{counter}")),
                record: json!({}),
                children,
            });
        }
        nodes
    })
}

fn relabel(nodes: Vec<RowNode>, counter: &mut usize) -> Vec<RowNode> {
    nodes
        .into_iter()
        .map(|n| {
            *counter += 1;
            let id = rid(&format!("n{counter}"));
            RowNode {
                id,
                record: n.record,
                children: relabel(n.children, counter),
            }
        })
        .collect()
}

proptest! {
    /// A flat dataset flattens to itself
    #[test]
    fn prop_flatten_idempotent(n in 0usize..200) {
        let nodes: Vec<RowNode> = (0..n).map(|i| leaf(&i.to_string())).collect();
        let rows = flatten(&nodes, &ExpansionState::new(), tree_options());
        prop_assert_eq!(rows.len(), n);
        for (i, row) in rows.iter().enumerate() {
            prop_assert_eq!(row.id().as_str(), i.to_string());
            prop_assert_eq!(row.flat_position(), i);
        }
    }

    /// Expanding then collapsing any node restores the exact sequence
    #[test]
    fn prop_expand_collapse_round_trip(nodes in forest_strategy(), pick in any::<prop::sample::Index>()) {
        let mut expansion = ExpansionState::new();
        let before = flatten(&nodes, &expansion, tree_options());
        if before.is_empty() {
            return Ok(());
        }
        let target = before[pick.index(before.len())].id().clone();
        expansion.set_expanded(&target, true);
        expansion.set_expanded(&target, false);
        let after = flatten(&nodes, &expansion, tree_options());
        prop_assert_eq!(before, after);
    }
}
