//! Node representation and the leaf authoring contract.
//!
//! Every node is one closed [`Behavior`] variant dispatched by pattern
//! match: leaves wrapping user callables, the [`Negate`] decorator, the
//! three composites, and the subtree bridge. There is no open hierarchy
//! and no downcasting; traversal and the scheduler branch on the variant
//! tag.
//!
//! [`Negate`]: Behavior::Negate

use crate::arena::{ChildSlots, NodeId, NodeRef};
use crate::composite::ParallelPolicy;
use crate::scheduler::Scheduler;
use crate::status::Status;
use crate::tree::BehaviorTree;

pub(crate) type ConditionFn = Box<dyn FnMut() -> bool>;
pub(crate) type ActionFn = Box<dyn FnMut() -> Status>;
pub(crate) type AsyncCallback = Box<dyn FnMut(AsyncHandle)>;

/// The party notified when a node reaches a terminal status: either the
/// composite/decorator/subtree awaiting the child, or the tree awaiting
/// its root.
#[derive(Clone)]
pub(crate) enum Observer {
    Parent(NodeRef),
    Tree(std::rc::Weak<crate::tree::TreeInner>),
}

/// Variant tag for a node, exposed to [`Visitor`]s.
///
/// [`Visitor`]: crate::Visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Condition,
    Action,
    AsyncAction,
    Negate,
    Sequence,
    Selector,
    Parallel,
    SubTree,
}

/// Per-variant state and links.
///
/// Callback slots are `Option`s because they are taken out of the arena
/// for the duration of a user call; user code may then reach back into the
/// scheduler (through an [`AsyncHandle`]) without tripping a re-entrant
/// borrow. The vacated slot swaps with `None`, so steady-state ticking
/// performs no allocation.
pub(crate) enum Behavior {
    Condition {
        check: Option<ConditionFn>,
    },
    Action {
        run: Option<ActionFn>,
    },
    AsyncAction {
        on_start: Option<AsyncCallback>,
        on_stop: Option<AsyncCallback>,
        /// Set when `on_start` panicked; the next update resolves to
        /// Failure instead of suspending.
        faulted: bool,
    },
    Negate {
        child: Option<NodeId>,
    },
    Sequence {
        children: ChildSlots,
        current: u16,
    },
    Selector {
        children: ChildSlots,
        current: u16,
    },
    Parallel {
        children: ChildSlots,
        success_policy: ParallelPolicy,
        failure_policy: ParallelPolicy,
        successes: u16,
        failures: u16,
    },
    SubTree {
        tree: BehaviorTree,
    },
}

pub(crate) struct Node {
    name: &'static str,
    status: Status,
    observer: Option<Observer>,
    behavior: Behavior,
}

impl Node {
    fn with(name: &'static str, behavior: Behavior) -> Self {
        Self {
            name,
            status: Status::Initial,
            observer: None,
            behavior,
        }
    }

    pub(crate) fn condition(name: &'static str, check: impl FnMut() -> bool + 'static) -> Self {
        Self::with(
            name,
            Behavior::Condition {
                check: Some(Box::new(check)),
            },
        )
    }

    pub(crate) fn action(name: &'static str, run: impl FnMut() -> Status + 'static) -> Self {
        Self::with(
            name,
            Behavior::Action {
                run: Some(Box::new(run)),
            },
        )
    }

    pub(crate) fn async_action(
        name: &'static str,
        on_start: impl FnMut(AsyncHandle) + 'static,
        on_stop: Option<AsyncCallback>,
    ) -> Self {
        Self::with(
            name,
            Behavior::AsyncAction {
                on_start: Some(Box::new(on_start)),
                on_stop,
                faulted: false,
            },
        )
    }

    pub(crate) fn negate() -> Self {
        Self::with("Negate", Behavior::Negate { child: None })
    }

    pub(crate) fn sequence(children: ChildSlots) -> Self {
        Self::with(
            "Sequence",
            Behavior::Sequence {
                children,
                current: 0,
            },
        )
    }

    pub(crate) fn selector(children: ChildSlots) -> Self {
        Self::with(
            "Selector",
            Behavior::Selector {
                children,
                current: 0,
            },
        )
    }

    pub(crate) fn parallel(
        children: ChildSlots,
        success_policy: ParallelPolicy,
        failure_policy: ParallelPolicy,
    ) -> Self {
        Self::with(
            "Parallel",
            Behavior::Parallel {
                children,
                success_policy,
                failure_policy,
                successes: 0,
                failures: 0,
            },
        )
    }

    pub(crate) fn subtree(name: &'static str, tree: BehaviorTree) -> Self {
        Self::with(name, Behavior::SubTree { tree })
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn status(&self) -> Status {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub(crate) fn observer(&self) -> Option<&Observer> {
        self.observer.as_ref()
    }

    pub(crate) fn set_observer(&mut self, observer: Observer) {
        self.observer = Some(observer);
    }

    pub(crate) fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub(crate) fn behavior_mut(&mut self) -> &mut Behavior {
        &mut self.behavior
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self.behavior {
            Behavior::Condition { .. } => NodeKind::Condition,
            Behavior::Action { .. } => NodeKind::Action,
            Behavior::AsyncAction { .. } => NodeKind::AsyncAction,
            Behavior::Negate { .. } => NodeKind::Negate,
            Behavior::Sequence { .. } => NodeKind::Sequence,
            Behavior::Selector { .. } => NodeKind::Selector,
            Behavior::Parallel { .. } => NodeKind::Parallel,
            Behavior::SubTree { .. } => NodeKind::SubTree,
        }
    }

    // Callback slot plumbing. Each pair vacates a slot for the duration of
    // a user call and puts the callable back afterwards.

    pub(crate) fn take_condition(&mut self) -> Option<ConditionFn> {
        match &mut self.behavior {
            Behavior::Condition { check } => check.take(),
            _ => None,
        }
    }

    pub(crate) fn put_condition(&mut self, f: ConditionFn) {
        if let Behavior::Condition { check } = &mut self.behavior {
            *check = Some(f);
        }
    }

    pub(crate) fn take_action(&mut self) -> Option<ActionFn> {
        match &mut self.behavior {
            Behavior::Action { run } => run.take(),
            _ => None,
        }
    }

    pub(crate) fn put_action(&mut self, f: ActionFn) {
        if let Behavior::Action { run } = &mut self.behavior {
            *run = Some(f);
        }
    }

    pub(crate) fn take_on_start(&mut self) -> Option<AsyncCallback> {
        match &mut self.behavior {
            Behavior::AsyncAction { on_start, .. } => on_start.take(),
            _ => None,
        }
    }

    pub(crate) fn put_on_start(&mut self, f: AsyncCallback) {
        if let Behavior::AsyncAction { on_start, .. } = &mut self.behavior {
            *on_start = Some(f);
        }
    }

    pub(crate) fn take_on_stop(&mut self) -> Option<AsyncCallback> {
        match &mut self.behavior {
            Behavior::AsyncAction { on_stop, .. } => on_stop.take(),
            _ => None,
        }
    }

    pub(crate) fn put_on_stop(&mut self, f: AsyncCallback) {
        if let Behavior::AsyncAction { on_stop, .. } = &mut self.behavior {
            *on_stop = Some(f);
        }
    }

    pub(crate) fn clear_async_fault(&mut self) {
        if let Behavior::AsyncAction { faulted, .. } = &mut self.behavior {
            *faulted = false;
        }
    }

    pub(crate) fn set_async_fault(&mut self) {
        if let Behavior::AsyncAction { faulted, .. } = &mut self.behavior {
            *faulted = true;
        }
    }

    pub(crate) fn async_faulted(&self) -> bool {
        matches!(self.behavior, Behavior::AsyncAction { faulted: true, .. })
    }
}

/// Handle given to an async action's callbacks.
///
/// An async action suspends when ticked; external code holding its handle
/// resolves it later by calling [`succeeded`] or [`failed`] exactly once
/// per activation. Extra calls, and calls made while the node is not
/// suspended, are ignored.
///
/// [`succeeded`]: AsyncHandle::succeeded
/// [`failed`]: AsyncHandle::failed
#[derive(Clone)]
pub struct AsyncHandle {
    pub(crate) node: NodeRef,
    pub(crate) scheduler: Scheduler,
}

impl AsyncHandle {
    /// Resolve the suspended action as successful.
    pub fn succeeded(&self) {
        self.resolve(Status::Success);
    }

    /// Resolve the suspended action as failed.
    pub fn failed(&self) {
        self.resolve(Status::Failure);
    }

    fn resolve(&self, status: Status) {
        let Some(arena) = self.node.upgrade() else {
            return;
        };
        let suspended = arena
            .borrow()
            .node(self.node.id())
            .is_some_and(|node| node.status() == Status::Suspended);
        if suspended {
            self.scheduler.completed(&self.node, status);
        }
    }
}
