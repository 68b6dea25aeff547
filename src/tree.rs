//! Tree-level binding: one root node, its arena, and a scheduler.
//!
//! A [`BehaviorTree`] is the restartable unit of execution handed out by
//! the builder. Ticking it advances the whole tree one round, restarting
//! the root whenever it is not already active. Dropping the last handle
//! cancels anything still in flight and destructs every node of the tree
//! in place, exactly once; the arena's backing storage is freed with its
//! last shared handle.

use std::cell::Cell;
use std::rc::Rc;

use crate::arena::{ChildSlots, NodeId, NodeRef, SharedArena};
use crate::node::{Behavior, Observer};
use crate::scheduler::Scheduler;
use crate::status::Status;
use crate::visitor::{NodeView, Visitor};

/// A behavior tree bound to its arena and scheduler.
///
/// Cloning shares the tree; it is also how a tree is embedded in another
/// one as a subtree. The embedded tree then runs under its host's
/// scheduler and relays its root's completions upward.
#[derive(Clone)]
pub struct BehaviorTree {
    inner: Rc<TreeInner>,
}

pub(crate) struct TreeInner {
    root: NodeId,
    arena: SharedArena,
    scheduler: Scheduler,
    /// Root is not scheduled: never started, completed, or stopped.
    idle: Cell<bool>,
}

impl BehaviorTree {
    pub(crate) fn new(root: NodeId, arena: SharedArena, scheduler: Scheduler) -> Self {
        Self {
            inner: Rc::new(TreeInner {
                root,
                arena,
                scheduler,
                idle: Cell::new(true),
            }),
        }
    }

    /// Advance the tree one round, (re)starting the root if it is idle.
    ///
    /// Returns the root status after the round: `Suspended` while work
    /// remains in flight, terminal once the tree resolved this round.
    pub fn tick(&self) -> Status {
        if self.inner.idle.replace(false) {
            self.inner.scheduler.start(
                self.root_ref(),
                Observer::Tree(Rc::downgrade(&self.inner)),
            );
        }
        self.inner.scheduler.tick();
        self.status()
    }

    /// Current root status, without advancing anything.
    pub fn status(&self) -> Status {
        self.inner
            .arena
            .borrow()
            .node(self.inner.root)
            .map_or(Status::Initial, |node| node.status())
    }

    /// Cancel the whole active subtree. The next [`tick`] starts over
    /// from the root.
    ///
    /// [`tick`]: BehaviorTree::tick
    pub fn stop(&self) {
        self.inner.scheduler.stop(&self.root_ref());
        self.inner.idle.set(true);
    }

    /// Walk the node hierarchy depth-first, treating embedded subtrees as
    /// leaves.
    pub fn traverse(&self, visitor: &mut dyn Visitor) {
        self.walk(visitor, false);
    }

    /// Walk the node hierarchy depth-first, descending into embedded
    /// subtrees.
    pub fn traverse_expanded(&self, visitor: &mut dyn Visitor) {
        self.walk(visitor, true);
    }

    fn walk(&self, visitor: &mut dyn Visitor, expand: bool) {
        visitor.begin();
        visit_node(&self.inner.arena, self.inner.root, visitor, expand);
        visitor.end();
    }

    fn root_ref(&self) -> NodeRef {
        NodeRef::new(&self.inner.arena, self.inner.root)
    }
}

impl std::fmt::Debug for BehaviorTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorTree")
            .field("root", &self.inner.root)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl TreeInner {
    /// Root completion observed: the next tick reschedules the root.
    pub(crate) fn mark_idle(&self) {
        self.idle.set(true);
    }
}

impl Drop for TreeInner {
    fn drop(&mut self) {
        let root = NodeRef::new(&self.arena, self.root);
        self.scheduler.stop(&root);
        release(&self.arena, self.root);
    }
}

/// Destruct a node and its children in place, children first, each
/// exactly once.
fn release(arena: &SharedArena, id: NodeId) {
    enum Links {
        None,
        One(NodeId),
        Many(ChildSlots),
    }
    let links = {
        let guard = arena.borrow();
        match guard.node(id).map(|node| node.behavior()) {
            Some(Behavior::Negate { child }) => child.map_or(Links::None, Links::One),
            Some(
                Behavior::Sequence { children, .. }
                | Behavior::Selector { children, .. }
                | Behavior::Parallel { children, .. },
            ) => Links::Many(*children),
            _ => Links::None,
        }
    };
    match links {
        Links::None => {}
        Links::One(child) => release(arena, child),
        Links::Many(slots) => {
            for index in 0..slots.count() {
                let child = arena.borrow().child(slots, index);
                if let Some(child) = child {
                    release(arena, child);
                }
            }
        }
    }
    // Take the node out before dropping it: a subtree node holds a tree
    // handle whose teardown may need to borrow this same arena.
    let node = arena.borrow_mut().release(id);
    drop(node);
}

fn visit_node(arena: &SharedArena, id: NodeId, visitor: &mut dyn Visitor, expand: bool) {
    enum Links {
        None,
        One(NodeId),
        Many(ChildSlots),
        Embedded(BehaviorTree),
    }
    let (view, links) = {
        let guard = arena.borrow();
        let Some(node) = guard.node(id) else {
            return;
        };
        let view = NodeView {
            name: node.name(),
            kind: node.kind(),
            status: node.status(),
        };
        let links = match node.behavior() {
            Behavior::Negate { child } => child.map_or(Links::None, Links::One),
            Behavior::Sequence { children, .. }
            | Behavior::Selector { children, .. }
            | Behavior::Parallel { children, .. } => Links::Many(*children),
            Behavior::SubTree { tree } if expand => Links::Embedded(tree.clone()),
            _ => Links::None,
        };
        (view, links)
    };
    visitor.visit(view);
    match links {
        Links::None => {}
        Links::One(child) => {
            visitor.before_children(view);
            visit_node(arena, child, visitor, expand);
            visitor.after_children(view);
        }
        Links::Many(slots) => {
            visitor.before_children(view);
            for index in 0..slots.count() {
                let child = arena.borrow().child(slots, index);
                if let Some(child) = child {
                    visit_node(arena, child, visitor, expand);
                }
            }
            visitor.after_children(view);
        }
        Links::Embedded(tree) => {
            visitor.before_children(view);
            visit_node(&tree.inner.arena, tree.inner.root, visitor, expand);
            visitor.after_children(view);
        }
    }
}

/// Start hook for a subtree node: start the embedded tree's root under
/// the host scheduler, with the subtree node observing it.
pub(crate) fn start_subtree(scheduler: &Scheduler, node: &NodeRef) {
    let Some(embedded) = embedded_tree(node) else {
        return;
    };
    scheduler.start(embedded.root_ref(), Observer::Parent(node.clone()));
}

/// Stop hook for a subtree node: cancel the embedded tree's root.
pub(crate) fn stop_subtree(scheduler: &Scheduler, node: &NodeRef) {
    let Some(embedded) = embedded_tree(node) else {
        return;
    };
    scheduler.stop(&embedded.root_ref());
}

fn embedded_tree(node: &NodeRef) -> Option<BehaviorTree> {
    let arena = node.upgrade()?;
    let guard = arena.borrow();
    match guard.node(node.id())?.behavior() {
        Behavior::SubTree { tree } => Some(tree.clone()),
        _ => None,
    }
}
