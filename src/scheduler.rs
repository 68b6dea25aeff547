//! Cooperative round-based scheduler.
//!
//! The scheduler owns a FIFO queue of node references currently under
//! evaluation. One call to [`tick`] is one round: every node queued when
//! the round begins is evaluated exactly once, nodes started during the
//! round run first (front insertion gives freshly expanded subtrees
//! depth-first activation), and completion notifications are delivered
//! synchronously so a parent advances before the round moves on.
//!
//! The queue holds weak handles; the scheduler never owns node memory and
//! entries for torn-down trees are skipped. One scheduler may drive
//! several trees, which is how subtrees run under their host.
//!
//! [`tick`]: Scheduler::tick

use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::arena::NodeRef;
use crate::composite;
use crate::decorator;
use crate::node::{AsyncHandle, NodeKind, Observer};
use crate::status::Status;
use crate::tree;

enum Entry {
    Node(NodeRef),
    /// Marker closing a round; everything queued behind it waits for the
    /// next round.
    EndOfRound,
}

/// The cooperative engine that ticks active nodes, propagates start and
/// stop, and routes completion notifications. Cloning shares the engine.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

struct SchedulerInner {
    queue: RefCell<VecDeque<Entry>>,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                queue: RefCell::new(VecDeque::new()),
            }),
        }
    }

    /// Record `observer` on `node` and queue the node at the front, ahead
    /// of anything queued earlier in the same round.
    pub(crate) fn start(&self, node: NodeRef, observer: Observer) {
        if let Some(arena) = node.upgrade()
            && let Some(target) = arena.borrow_mut().node_mut(node.id())
        {
            target.set_observer(observer);
        }
        self.inner.queue.borrow_mut().push_front(Entry::Node(node));
    }

    /// Run one round of evaluation.
    pub(crate) fn tick(&self) {
        {
            let mut queue = self.inner.queue.borrow_mut();
            if queue.is_empty() {
                return;
            }
            queue.push_back(Entry::EndOfRound);
        }
        loop {
            let entry = self.inner.queue.borrow_mut().pop_front();
            let node = match entry {
                None | Some(Entry::EndOfRound) => break,
                Some(Entry::Node(node)) => node,
            };
            let Some(status) = self.evaluate(&node) else {
                continue;
            };
            if status == Status::Running {
                // Still running: resumes next round, after everything
                // queued for this one.
                self.inner.queue.borrow_mut().push_back(Entry::Node(node));
            } else if status != Status::Suspended {
                self.notify(&node, status);
            }
        }
    }

    /// Force a node's terminal status from outside the normal update path
    /// and notify its observer. Entry point for async completions; safe
    /// to call between rounds and never re-enters [`tick`].
    ///
    /// [`tick`]: Scheduler::tick
    pub(crate) fn completed(&self, node: &NodeRef, status: Status) {
        let Some(arena) = node.upgrade() else {
            return;
        };
        let name = {
            let mut guard = arena.borrow_mut();
            let Some(target) = guard.node_mut(node.id()) else {
                return;
            };
            target.set_status(status);
            target.name()
        };
        debug!(node = name, %status, "completed");
        self.notify(node, status);
    }

    /// Cancel a node: run its stop hook (recursively cancelling active
    /// children), force `Failure`, and purge its queue entries so a
    /// cancelled node is never ticked again.
    pub(crate) fn stop(&self, node: &NodeRef) {
        if let Some(arena) = node.upgrade() {
            let active = arena
                .borrow()
                .node(node.id())
                .is_some_and(|n| n.status().is_active());
            if active {
                self.run_stop(node);
                if let Some(target) = arena.borrow_mut().node_mut(node.id()) {
                    target.set_status(Status::Failure);
                    trace!(node = target.name(), "stopped");
                }
            }
        }
        // Unconditional: a queued child that never started must not run
        // after its parent was cancelled.
        self.inner.queue.borrow_mut().retain(|entry| match entry {
            Entry::Node(queued) => !queued.same(node),
            Entry::EndOfRound => true,
        });
    }

    /// One lifecycle transition: start unless already running, then
    /// update; the update verdict becomes the node's status.
    fn evaluate(&self, node: &NodeRef) -> Option<Status> {
        let arena = node.upgrade()?;
        let (name, previous) = {
            let guard = arena.borrow();
            let target = guard.node(node.id())?;
            (target.name(), target.status())
        };
        if previous != Status::Running {
            self.run_start(node);
        }
        let status = self.run_update(node)?;
        arena.borrow_mut().node_mut(node.id())?.set_status(status);
        trace!(node = name, %status, "tick");
        Some(status)
    }

    fn run_start(&self, node: &NodeRef) {
        let Some(arena) = node.upgrade() else {
            return;
        };
        let Some(kind) = arena.borrow().node(node.id()).map(|n| n.kind()) else {
            return;
        };
        match kind {
            NodeKind::Sequence | NodeKind::Selector => composite::start_first(self, node),
            NodeKind::Parallel => composite::start_all(self, node),
            NodeKind::Negate => decorator::start(self, node),
            NodeKind::SubTree => tree::start_subtree(self, node),
            NodeKind::AsyncAction => self.start_async(node),
            NodeKind::Condition | NodeKind::Action => {}
        }
    }

    fn run_update(&self, node: &NodeRef) -> Option<Status> {
        let arena = node.upgrade()?;
        let kind = arena.borrow().node(node.id())?.kind();
        let status = match kind {
            NodeKind::Condition => {
                let check = arena.borrow_mut().node_mut(node.id())?.take_condition();
                match check {
                    Some(mut check) => {
                        let verdict = panic::catch_unwind(AssertUnwindSafe(|| check()));
                        if let Some(target) = arena.borrow_mut().node_mut(node.id()) {
                            target.put_condition(check);
                        }
                        match verdict {
                            Ok(true) => Status::Success,
                            // A panicking user callable reads as a failed
                            // check; faults never escape the tick.
                            Ok(false) | Err(_) => Status::Failure,
                        }
                    }
                    None => Status::Failure,
                }
            }
            NodeKind::Action => {
                let run = arena.borrow_mut().node_mut(node.id())?.take_action();
                match run {
                    Some(mut run) => {
                        let verdict = panic::catch_unwind(AssertUnwindSafe(|| run()));
                        if let Some(target) = arena.borrow_mut().node_mut(node.id()) {
                            target.put_action(run);
                        }
                        verdict.unwrap_or(Status::Failure)
                    }
                    None => Status::Failure,
                }
            }
            NodeKind::AsyncAction => {
                if arena.borrow().node(node.id())?.async_faulted() {
                    Status::Failure
                } else {
                    Status::Suspended
                }
            }
            // Composites, decorators and subtrees wait on their children;
            // progress arrives through the completion path.
            _ => Status::Suspended,
        };
        Some(status)
    }

    /// Start hook for async actions: hand the user callback a handle to
    /// resolve later. The callback runs with no internal borrows held, so
    /// it may call into the scheduler immediately if it wants to.
    fn start_async(&self, node: &NodeRef) {
        let Some(arena) = node.upgrade() else {
            return;
        };
        let on_start = {
            let mut guard = arena.borrow_mut();
            let Some(target) = guard.node_mut(node.id()) else {
                return;
            };
            target.clear_async_fault();
            target.take_on_start()
        };
        let Some(mut on_start) = on_start else {
            return;
        };
        let handle = AsyncHandle {
            node: node.clone(),
            scheduler: self.clone(),
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| on_start(handle)));
        let mut guard = arena.borrow_mut();
        if let Some(target) = guard.node_mut(node.id()) {
            target.put_on_start(on_start);
            if outcome.is_err() {
                target.set_async_fault();
            }
        }
    }

    fn run_stop(&self, node: &NodeRef) {
        let Some(arena) = node.upgrade() else {
            return;
        };
        let Some(kind) = arena.borrow().node(node.id()).map(|n| n.kind()) else {
            return;
        };
        match kind {
            NodeKind::Sequence | NodeKind::Selector | NodeKind::Parallel => {
                composite::cancel_children(self, node);
            }
            NodeKind::Negate => decorator::cancel_child(self, node),
            NodeKind::SubTree => tree::stop_subtree(self, node),
            NodeKind::AsyncAction => self.stop_async(node),
            NodeKind::Condition | NodeKind::Action => {}
        }
    }

    fn stop_async(&self, node: &NodeRef) {
        let Some(arena) = node.upgrade() else {
            return;
        };
        let on_stop = {
            let mut guard = arena.borrow_mut();
            guard.node_mut(node.id()).and_then(|n| n.take_on_stop())
        };
        let Some(mut on_stop) = on_stop else {
            return;
        };
        let handle = AsyncHandle {
            node: node.clone(),
            scheduler: self.clone(),
        };
        // A fault in a cancellation callback is swallowed; the node is
        // being forced to Failure either way.
        let _ = panic::catch_unwind(AssertUnwindSafe(|| on_stop(handle)));
        if let Some(target) = arena.borrow_mut().node_mut(node.id()) {
            target.put_on_stop(on_stop);
        }
    }

    /// Deliver a terminal status to the node's observer, advancing parents
    /// synchronously until the chain settles.
    fn notify(&self, node: &NodeRef, status: Status) {
        let mut current = Some((node.clone(), status));
        while let Some((finished, status)) = current.take() {
            let observer = finished
                .upgrade()
                .and_then(|arena| arena.borrow().node(finished.id())?.observer().cloned());
            match observer {
                None => {}
                Some(Observer::Tree(owner)) => {
                    if let Some(owner) = owner.upgrade() {
                        owner.mark_idle();
                    }
                }
                Some(Observer::Parent(parent)) => {
                    current = self.deliver(&parent, status);
                }
            }
        }
    }

    /// Route one child completion into its parent; returns the parent's
    /// own completion when this resolves it.
    fn deliver(&self, parent: &NodeRef, status: Status) -> Option<(NodeRef, Status)> {
        let arena = parent.upgrade()?;
        let kind = arena.borrow().node(parent.id())?.kind();
        let resolved = match kind {
            NodeKind::Sequence | NodeKind::Selector | NodeKind::Parallel => {
                composite::child_completed(self, parent, status)?
            }
            NodeKind::Negate => decorator::child_completed(status),
            // A subtree relays the embedded root's outcome untouched.
            NodeKind::SubTree => status,
            _ => return None,
        };
        arena
            .borrow_mut()
            .node_mut(parent.id())?
            .set_status(resolved);
        Some((parent.clone(), resolved))
    }
}
