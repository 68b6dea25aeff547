//! Single-node lifecycle, leaf fault recovery, negation and traversal.

mod common;

use behavior_tree::{Builder, NodeKind, NodeView, Status, Visitor};
use common::{probe, scripted};

#[test]
fn single_leaf_restarts_after_each_completion() {
    let p = probe();
    let mut builder = Builder::new();
    let tree = builder
        .action("flaky", scripted(&p, &[Status::Failure, Status::Success]))
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(tree.tick(), Status::Failure);
    assert_eq!(tree.tick(), Status::Success);
    assert_eq!(p.updates.get(), 2);
}

#[test]
fn condition_maps_bool_to_status() {
    let mut builder = Builder::new();
    let tree = builder.condition("yes", || true).end().unwrap().unwrap();
    assert_eq!(tree.tick(), Status::Success);

    let tree = builder.condition("no", || false).end().unwrap().unwrap();
    assert_eq!(tree.tick(), Status::Failure);
}

#[test]
fn status_is_initial_before_first_tick() {
    let mut builder = Builder::new();
    let tree = builder.condition("yes", || true).end().unwrap().unwrap();
    assert_eq!(tree.status(), Status::Initial);
}

#[test]
fn panicking_condition_reads_as_failure() {
    let mut builder = Builder::new();
    let tree = builder
        .condition("broken", || panic!("boom"))
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(tree.tick(), Status::Failure);
}

#[test]
fn panicking_action_reads_as_failure() {
    let mut builder = Builder::new();
    let tree = builder
        .sequence(2)
        .action("broken", || panic!("boom"))
        .action("unreached", || Status::Success)
        .end()
        .unwrap()
        .unwrap();

    // The fault is contained in the leaf; the sequence sees an ordinary
    // failure.
    assert_eq!(tree.tick(), Status::Failure);
}

#[test]
fn faulted_leaf_can_run_again_next_activation() {
    let mut fail_once = true;
    let mut builder = Builder::new();
    let tree = builder
        .action("sometimes", move || {
            if std::mem::take(&mut fail_once) {
                panic!("boom");
            }
            Status::Success
        })
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(tree.tick(), Status::Failure);
    assert_eq!(tree.tick(), Status::Success);
}

// ----------------------------------------------------------------------------
// Negate
// ----------------------------------------------------------------------------

#[test]
fn negate_inverts_terminal_outcomes() {
    let mut builder = Builder::new();
    let tree = builder
        .negate()
        .condition("yes", || true)
        .end()
        .unwrap()
        .unwrap();
    assert_eq!(tree.tick(), Status::Failure);

    let tree = builder
        .negate()
        .condition("no", || false)
        .end()
        .unwrap()
        .unwrap();
    assert_eq!(tree.tick(), Status::Success);
}

#[test]
fn negate_passes_suspension_through() {
    let p = probe();
    let mut builder = Builder::new();
    let tree = builder
        .negate()
        .action("slow", scripted(&p, &[Status::Running, Status::Success]))
        .end()
        .unwrap()
        .unwrap();

    // While the child runs the decorator has no verdict to invert.
    assert_eq!(tree.tick(), Status::Suspended);
    assert_eq!(tree.tick(), Status::Failure);
    assert_eq!(p.updates.get(), 2);
}

#[test]
fn negate_inside_sequence_guards_a_branch() {
    let p = probe();
    let mut builder = Builder::new();
    let tree = builder
        .sequence(2)
        .negate()
        .condition("enemy visible", || false)
        .action("patrol", scripted(&p, &[Status::Success]))
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(tree.tick(), Status::Success);
    assert_eq!(p.updates.get(), 1);
}

// ----------------------------------------------------------------------------
// Traversal
// ----------------------------------------------------------------------------

#[derive(Default)]
struct Outline {
    depth: usize,
    lines: Vec<String>,
}

impl Visitor for Outline {
    fn visit(&mut self, node: NodeView) {
        self.lines
            .push(format!("{}{}", "  ".repeat(self.depth), node.name));
    }

    fn before_children(&mut self, _node: NodeView) {
        self.depth += 1;
    }

    fn after_children(&mut self, _node: NodeView) {
        self.depth -= 1;
    }
}

#[test]
fn traverse_walks_depth_first_in_declaration_order() {
    let mut builder = Builder::with_capacity(2048);
    let tree = builder
        .selector(2)
        .sequence(2)
        .condition("adjacent", || true)
        .action("attack", || Status::Success)
        .action("wander", || Status::Success)
        .end()
        .unwrap()
        .unwrap();

    let mut outline = Outline::default();
    tree.traverse(&mut outline);

    assert_eq!(
        outline.lines,
        [
            "Selector",
            "  Sequence",
            "    adjacent",
            "    attack",
            "  wander",
        ]
    );
}

#[test]
fn traverse_reports_statuses_after_a_round() {
    struct Kinds(Vec<(NodeKind, Status)>);
    impl Visitor for Kinds {
        fn visit(&mut self, node: NodeView) {
            self.0.push((node.kind, node.status));
        }
    }

    let mut builder = Builder::new();
    let tree = builder
        .sequence(2)
        .condition("ready", || true)
        .action("swing", || Status::Success)
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(tree.tick(), Status::Success);

    let mut kinds = Kinds(Vec::new());
    tree.traverse(&mut kinds);
    assert_eq!(
        kinds.0,
        [
            (NodeKind::Sequence, Status::Success),
            (NodeKind::Condition, Status::Success),
            (NodeKind::Action, Status::Success),
        ]
    );
}

#[test]
fn traverse_treats_subtrees_as_leaves_unless_expanded() {
    let mut builder = Builder::with_capacity(2048);
    let inner = builder
        .action("attack", || Status::Success)
        .end()
        .unwrap()
        .unwrap();
    let outer = builder
        .sequence(2)
        .subtree("Combat", &inner)
        .action("retreat", || Status::Success)
        .end()
        .unwrap()
        .unwrap();

    let mut flat = Outline::default();
    outer.traverse(&mut flat);
    assert_eq!(flat.lines, ["Sequence", "  Combat", "  retreat"]);

    let mut expanded = Outline::default();
    outer.traverse_expanded(&mut expanded);
    assert_eq!(
        expanded.lines,
        ["Sequence", "  Combat", "    attack", "  retreat"]
    );
}
