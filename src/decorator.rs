//! Decorator control flow.
//!
//! A decorator wraps exactly one child and transforms its outcome.
//! [`Negate`] is the NOT of the tree algebra: Success and Failure swap,
//! anything non-terminal passes through untouched (the decorator itself
//! stays `Suspended` while the child runs).
//!
//! [`Negate`]: crate::NodeKind::Negate

use crate::arena::NodeRef;
use crate::node::{Behavior, Observer};
use crate::scheduler::Scheduler;
use crate::status::Status;

/// Start hook: start the single child with the decorator observing it.
pub(crate) fn start(scheduler: &Scheduler, node: &NodeRef) {
    let Some(child) = child_of(node) else {
        return;
    };
    scheduler.start(child, Observer::Parent(node.clone()));
}

/// Completion path: the child's terminal status, inverted.
pub(crate) fn child_completed(status: Status) -> Status {
    status.invert()
}

/// Stop hook: cancel the active child.
pub(crate) fn cancel_child(scheduler: &Scheduler, node: &NodeRef) {
    let Some(child) = child_of(node) else {
        return;
    };
    scheduler.stop(&child);
}

fn child_of(node: &NodeRef) -> Option<NodeRef> {
    let arena = node.upgrade()?;
    let child = match arena.borrow().node(node.id())?.behavior() {
        Behavior::Negate { child } => (*child)?,
        _ => return None,
    };
    Some(node.sibling(child))
}
