//! Composite control flow.
//!
//! Composites own an ordered set of children and decide how their
//! completions combine: [`Sequence`] (AND logic), [`Selector`] (OR logic)
//! and [`Parallel`] (fan-out with completion policies). A composite does
//! no work of its own while children run; its update reports `Suspended`
//! and progress happens in the completion path below, synchronously within
//! the round that the child finished in.
//!
//! [`Sequence`]: crate::NodeKind::Sequence
//! [`Selector`]: crate::NodeKind::Selector
//! [`Parallel`]: crate::NodeKind::Parallel

use crate::arena::{ChildSlots, NodeRef};
use crate::node::{Behavior, Observer};
use crate::scheduler::Scheduler;
use crate::status::Status;

/// Completion policy for a `Parallel` composite.
///
/// The success and failure policies are independent: `RequireOne` resolves
/// the aggregate on the first matching child outcome (cancelling the
/// remaining children), `RequireAll` waits for every child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelPolicy {
    /// One matching child outcome resolves the aggregate.
    RequireOne,
    /// Every child must produce the outcome.
    RequireAll,
}

/// Start hook for `Sequence` and `Selector`: reset the cursor and start
/// child 0.
pub(crate) fn start_first(scheduler: &Scheduler, node: &NodeRef) {
    let Some(arena) = node.upgrade() else {
        return;
    };
    let slots = {
        let mut guard = arena.borrow_mut();
        let Some(parent) = guard.node_mut(node.id()) else {
            return;
        };
        match parent.behavior_mut() {
            Behavior::Sequence { children, current } | Behavior::Selector { children, current } => {
                *current = 0;
                *children
            }
            _ => return,
        }
    };
    let first = arena.borrow().child(slots, 0);
    if let Some(first) = first {
        scheduler.start(node.sibling(first), Observer::Parent(node.clone()));
    }
}

/// Start hook for `Parallel`: reset both counters and start every child.
///
/// Children are queued back to front; with the scheduler's front
/// insertion they tick in declaration order.
pub(crate) fn start_all(scheduler: &Scheduler, node: &NodeRef) {
    let Some(arena) = node.upgrade() else {
        return;
    };
    let slots = {
        let mut guard = arena.borrow_mut();
        let Some(parent) = guard.node_mut(node.id()) else {
            return;
        };
        match parent.behavior_mut() {
            Behavior::Parallel {
                children,
                successes,
                failures,
                ..
            } => {
                *successes = 0;
                *failures = 0;
                *children
            }
            _ => return,
        }
    };
    for index in (0..slots.count()).rev() {
        let child = arena.borrow().child(slots, index);
        if let Some(child) = child {
            scheduler.start(node.sibling(child), Observer::Parent(node.clone()));
        }
    }
}

enum Step {
    /// The composite resolved.
    Complete(Status),
    /// The composite resolved; cancel the remaining children first.
    CancelThenComplete(Status),
    /// Move on to the next child.
    Next { slots: ChildSlots, index: u16 },
    /// Still waiting on children.
    Wait,
}

/// Feed a child's terminal status into its composite parent.
///
/// Returns the composite's own completion once it resolves; `None` while
/// it is still waiting (the next child, if any, has already been started).
pub(crate) fn child_completed(
    scheduler: &Scheduler,
    parent: &NodeRef,
    status: Status,
) -> Option<Status> {
    let arena = parent.upgrade()?;
    let step = {
        let mut guard = arena.borrow_mut();
        let node = guard.node_mut(parent.id())?;
        match node.behavior_mut() {
            // AND: any failure short-circuits, all successes succeed.
            Behavior::Sequence { children, current } => {
                if status == Status::Failure {
                    Step::Complete(Status::Failure)
                } else {
                    *current += 1;
                    if *current == children.count() {
                        Step::Complete(Status::Success)
                    } else {
                        Step::Next {
                            slots: *children,
                            index: *current,
                        }
                    }
                }
            }
            // OR: any success short-circuits, all failures fail.
            Behavior::Selector { children, current } => {
                if status == Status::Success {
                    Step::Complete(Status::Success)
                } else {
                    *current += 1;
                    if *current == children.count() {
                        Step::Complete(Status::Failure)
                    } else {
                        Step::Next {
                            slots: *children,
                            index: *current,
                        }
                    }
                }
            }
            Behavior::Parallel {
                children,
                success_policy,
                failure_policy,
                successes,
                failures,
            } => {
                match status {
                    Status::Success => *successes += 1,
                    Status::Failure => *failures += 1,
                    _ => {}
                }
                let count = children.count();
                if status == Status::Success && *success_policy == ParallelPolicy::RequireOne {
                    Step::CancelThenComplete(Status::Success)
                } else if status == Status::Failure
                    && *failure_policy == ParallelPolicy::RequireOne
                {
                    Step::CancelThenComplete(Status::Failure)
                } else if *failure_policy == ParallelPolicy::RequireAll && *failures == count {
                    Step::Complete(Status::Failure)
                } else if *success_policy == ParallelPolicy::RequireAll && *successes == count {
                    Step::Complete(Status::Success)
                } else if *success_policy == ParallelPolicy::RequireAll
                    && *failure_policy == ParallelPolicy::RequireAll
                    && *successes + *failures == count
                {
                    // Mixed split under RequireAll/RequireAll: neither
                    // counter can reach the total, so the aggregate
                    // resolves as failure once every child has completed.
                    Step::Complete(Status::Failure)
                } else {
                    Step::Wait
                }
            }
            _ => Step::Wait,
        }
    };
    match step {
        Step::Complete(resolved) => Some(resolved),
        Step::CancelThenComplete(resolved) => {
            cancel_children(scheduler, parent);
            Some(resolved)
        }
        Step::Next { slots, index } => {
            let child = arena.borrow().child(slots, index);
            if let Some(child) = child {
                scheduler.start(parent.sibling(child), Observer::Parent(parent.clone()));
            }
            None
        }
        Step::Wait => None,
    }
}

/// Stop hook shared by all composites: cancel every active child.
///
/// Inactive children (never started, or already terminal) are skipped by
/// the scheduler's stop guard but still purged from the queue.
pub(crate) fn cancel_children(scheduler: &Scheduler, node: &NodeRef) {
    let Some(arena) = node.upgrade() else {
        return;
    };
    let slots = {
        let guard = arena.borrow();
        match guard.node(node.id()).map(|n| n.behavior()) {
            Some(
                Behavior::Sequence { children, .. }
                | Behavior::Selector { children, .. }
                | Behavior::Parallel { children, .. },
            ) => *children,
            _ => return,
        }
    };
    for index in 0..slots.count() {
        let child = arena.borrow().child(slots, index);
        if let Some(child) = child {
            scheduler.stop(&node.sibling(child));
        }
    }
}
