//! Golden tests for the vessel branch kernel.
//!
//! These tests pin the tree semantics, the pairing outputs and the export
//! formats on small hand-checked topologies.

use vessel_branch_kernel::{
    from_adjacency_list, to_adjacency_list, to_adjacency_matrix, to_dgtal, to_polyline,
    AdjacencyList, AllInOne, BranchTree, InMemoryPointSource, NodeId, OnePerBranch,
    ParentEdge, PlaceStatus, PlacementWizard, Position, PositionMap, SegmentPairingStrategy,
    StrategyKind, TopologySnapshot, VesselTemplate, WizardEvent,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn build(edges: &[(&str, Option<&str>)]) -> BranchTree {
    let mut tree = BranchTree::new();
    for (id, parent) in edges {
        tree.insert_after_node(*id, *parent).unwrap();
    }
    tree
}

fn positions(entries: &[(&str, [f64; 3])]) -> PositionMap {
    entries
        .iter()
        .map(|(id, p)| (NodeId::new(*id), Position::from(*p)))
        .collect()
}

fn scenario_e() -> BranchTree {
    build(&[
        ("N00", None),
        ("N10", Some("N00")),
        ("N11", Some("N00")),
        ("N20", Some("N11")),
        ("N30", Some("N20")),
    ])
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_second_top_level_insert_becomes_root() {
    let tree = build(&[("A", None), ("B", None)]);

    assert_eq!(tree.root_id().unwrap(), "B");
    assert_eq!(
        tree.tree_parent_list(),
        vec![ParentEdge::root("B"), ParentEdge::edge("B", "A")]
    );
    assert_eq!(
        serde_json::to_string(&to_adjacency_list(&tree)).unwrap(),
        r#"[[null,"B"],["B","A"]]"#
    );
}

#[test]
fn test_branching_root_is_not_removed() {
    let mut tree = build(&[("P", None), ("C1", Some("P")), ("C2", Some("P"))]);
    let before = tree.clone();

    assert!(!tree.remove_node("P").unwrap());
    assert_eq!(tree, before);
}

#[test]
fn test_single_child_root_removal_promotes_child() {
    let mut tree = build(&[
        ("P", None),
        ("C1", Some("P")),
        ("S1", Some("C1")),
        ("S2", Some("C1")),
        ("S3", Some("C1")),
    ]);

    assert!(tree.remove_node("P").unwrap());
    assert_eq!(tree.root_id().unwrap(), "C1");
    assert!(tree.is_root("C1"));
    assert_eq!(tree.children_ids("C1"), ["S1", "S2", "S3"].map(NodeId::from).as_slice());
    assert_eq!(tree.len(), 4);
}

// ─────────────────────────────────────────────────────────────────────────────
// Pairing
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_pairing_on_two_child_tree() {
    let tree = build(&[("P", None), ("C1", Some("P")), ("C2", Some("P"))]);
    let pos = positions(&[
        ("P", [0.0, 0.0, 0.0]),
        ("C1", [1.0, 0.0, 0.0]),
        ("C2", [2.0, 0.0, 0.0]),
    ]);

    let units = OnePerBranch.work_units(&tree, &pos).unwrap();
    let pairs: Vec<_> = units.iter().map(|u| u.id_pair().unwrap()).collect();
    assert_eq!(pairs.len(), 2);
    assert_eq!((pairs[0].0.as_str(), pairs[0].1.as_str()), ("P", "C1"));
    assert_eq!((pairs[1].0.as_str(), pairs[1].1.as_str()), ("P", "C2"));
    assert_eq!(units[1].ends, vec![Position::new(2.0, 0.0, 0.0)]);

    let all = AllInOne.work_units(&tree, &pos).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].seed_ids, vec!["P"]);
    assert_eq!(all[0].end_ids, vec!["C1", "C2"]);
    assert_eq!(all[0].seeds, vec![Position::new(0.0, 0.0, 0.0)]);
}

#[test]
fn test_every_strategy_is_deterministic() {
    let tree = VesselTemplate::Portal.build().unwrap();
    let pos: PositionMap = tree
        .node_list()
        .into_iter()
        .enumerate()
        .map(|(i, id)| (id, Position::new(i as f64, (i * 2) as f64, 0.0)))
        .collect();

    for kind in StrategyKind::ALL {
        let first = kind.strategy().work_units(&tree, &pos).unwrap();
        let second = kind.strategy().work_units(&tree.clone(), &pos).unwrap();
        assert_eq!(first, second, "strategy {kind}");
        assert!(!first.is_empty());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Exports
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_adjacency_matrix() {
    let matrix = to_adjacency_matrix(&scenario_e());

    assert_eq!(matrix.ids, ["N00", "N10", "N11", "N20", "N30"].map(NodeId::from).to_vec());
    let expected_ones = [(0, 1), (0, 2), (2, 3), (3, 4)];
    for i in 0..5 {
        for j in 0..5 {
            let edge = expected_ones.contains(&(i, j)) || expected_ones.contains(&(j, i));
            assert_eq!(matrix.matrix[i][j], u8::from(edge), "entry ({i}, {j})");
        }
    }
}

#[test]
fn test_adjacency_list_round_trip_keeps_order() {
    let tree = VesselTemplate::InferiorCava.build().unwrap();
    let list = to_adjacency_list(&tree);
    let json = list.to_json().unwrap();

    let rebuilt = from_adjacency_list(&AdjacencyList::from_json(&json).unwrap()).unwrap();
    assert_eq!(to_adjacency_list(&rebuilt), list);
    assert_eq!(rebuilt.preorder(), tree.preorder());
}

#[test]
fn test_dgtal_and_polyline() {
    let tree = scenario_e();
    let pos = positions(&[
        ("N00", [0.0, 0.0, 0.0]),
        ("N10", [1.0, 0.0, 0.0]),
        ("N11", [0.0, 1.0, 0.0]),
        ("N20", [0.0, 2.0, 0.0]),
        ("N30", [0.0, 3.0, 0.0]),
    ]);

    let graph = to_dgtal(&pos, &tree).unwrap();
    assert_eq!(graph.edges, vec![[0, 1], [0, 2], [2, 3], [3, 4]]);
    assert_eq!(graph.vertices[3], Position::new(0.0, 2.0, 0.0));

    let line = to_polyline(&tree, &pos).unwrap();
    let ids: Vec<&str> = line
        .iter()
        .map(|p| pos.iter().find(|(_, q)| *q == p).unwrap().0.as_str())
        .collect();
    assert_eq!(ids, ["N00", "N10", "N00", "N11", "N20", "N30", "N20", "N11", "N00"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Wizard and snapshot determinism
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_three_node_chain_placement() {
    let mut tree = BranchTree::new();
    tree.insert_after_node("root", None).unwrap();
    tree.insert_after_node("mid", Some("root")).unwrap();
    tree.insert_after_node("leaf", Some("mid")).unwrap();

    let mut wizard = PlacementWizard::from_tree(InMemoryPointSource::new(), tree, VesselTemplate::Empty);
    let completed = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = completed.clone();
    wizard.subscribe(move |e| {
        if *e == WizardEvent::PlacementCompleted {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    });

    wizard.request_select("root");
    wizard.place_point(Position::new(0.0, 0.0, 0.0)).unwrap();
    assert_eq!(wizard.current_node().unwrap(), "mid");

    wizard.place_point(Position::new(1.0, 0.0, 0.0)).unwrap();
    assert_eq!(wizard.current_node().unwrap(), "leaf");
    assert_eq!(wizard.tree().status("leaf"), Some(PlaceStatus::Placing));

    wizard.place_point(Position::new(2.0, 0.0, 0.0)).unwrap();
    assert!(wizard.tree().are_all_nodes_placed());
    assert_eq!(completed.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn test_snapshot_golden_determinism() {
    let a = TopologySnapshot::compute(&VesselTemplate::Portal.build().unwrap()).unwrap();
    let b = TopologySnapshot::compute(&VesselTemplate::Portal.build().unwrap()).unwrap();
    assert_eq!(a.snapshot_id, b.snapshot_id);
    assert_eq!(a.edge_list_hash, b.edge_list_hash);
    assert_eq!(a.node_count, 16);
    assert_eq!(a.edge_count, 15);

    let ivc = TopologySnapshot::compute(&VesselTemplate::InferiorCava.build().unwrap()).unwrap();
    assert_ne!(a.snapshot_id, ivc.snapshot_id);
    assert_eq!(a.to_canonical_bytes().unwrap(), a.to_canonical_bytes().unwrap());
}
