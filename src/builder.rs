//! Fluent tree construction.
//!
//! A [`Builder`] allocates nodes into a shared arena and wires declared
//! child slots left to right as nodes arrive. One builder can produce
//! several trees; they share the arena and the scheduler, which is what
//! lets one tree embed another as a subtree.
//!
//! Structural mistakes made mid-chain (a node outside any open group, an
//! allocation that does not fit) are recorded and reported by [`end`] —
//! a defective definition never yields a truncated tree.
//!
//! [`end`]: Builder::end

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::arena::{Arena, ChildSlots, NodeId, SharedArena};
use crate::composite::ParallelPolicy;
use crate::error::BuildError;
use crate::node::{AsyncHandle, Behavior, Node};
use crate::scheduler::Scheduler;
use crate::status::Status;
use crate::tree::BehaviorTree;

/// Default arena capacity in bytes; enough for a dozen or so nodes.
const DEFAULT_CAPACITY: usize = 1024;

/// An open composite or decorator whose declared child slots are being
/// filled.
struct Group {
    parent: NodeId,
    declared: u16,
    filled: u16,
}

pub struct Builder {
    arena: SharedArena,
    scheduler: Scheduler,
    root: Option<NodeId>,
    groups: Vec<Group>,
    defect: Option<BuildError>,
}

impl Builder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A builder whose arena holds at most `max_bytes` of nodes and child
    /// slots, across every tree it builds.
    pub fn with_capacity(max_bytes: usize) -> Self {
        Self {
            arena: Rc::new(RefCell::new(Arena::new(max_bytes))),
            scheduler: Scheduler::new(),
            root: None,
            groups: Vec::new(),
            defect: None,
        }
    }

    /// A leaf that evaluates a boolean check: `true` reads as Success,
    /// `false` as Failure.
    pub fn condition(
        &mut self,
        name: &'static str,
        check: impl FnMut() -> bool + 'static,
    ) -> &mut Self {
        self.leaf(Node::condition(name, check))
    }

    /// A leaf that runs an action and returns its verdict directly. An
    /// action may return `Running` to be resumed next round.
    pub fn action(
        &mut self,
        name: &'static str,
        run: impl FnMut() -> Status + 'static,
    ) -> &mut Self {
        self.leaf(Node::action(name, run))
    }

    /// A leaf that suspends when ticked; `on_start` receives an
    /// [`AsyncHandle`] and external code resolves the node through it.
    pub fn async_action(
        &mut self,
        name: &'static str,
        on_start: impl FnMut(AsyncHandle) + 'static,
    ) -> &mut Self {
        self.leaf(Node::async_action(name, on_start, None))
    }

    /// Like [`async_action`], with a callback invoked when the node is
    /// cancelled while in flight.
    ///
    /// [`async_action`]: Builder::async_action
    pub fn async_action_with_stop(
        &mut self,
        name: &'static str,
        on_start: impl FnMut(AsyncHandle) + 'static,
        on_stop: impl FnMut(AsyncHandle) + 'static,
    ) -> &mut Self {
        self.leaf(Node::async_action(name, on_start, Some(Box::new(on_stop))))
    }

    /// A leaf embedding an independently built tree; it relays the
    /// embedded root's completion.
    pub fn subtree(&mut self, name: &'static str, tree: &BehaviorTree) -> &mut Self {
        self.leaf(Node::subtree(name, tree.clone()))
    }

    /// AND composite over the next `children` nodes.
    pub fn sequence(&mut self, children: u16) -> &mut Self {
        self.composite(children, Node::sequence)
    }

    /// OR composite over the next `children` nodes.
    pub fn selector(&mut self, children: u16) -> &mut Self {
        self.composite(children, Node::selector)
    }

    /// Fan-out composite over the next `children` nodes, resolving per
    /// the given policies.
    pub fn parallel(
        &mut self,
        children: u16,
        success: ParallelPolicy,
        failure: ParallelPolicy,
    ) -> &mut Self {
        self.composite(children, |slots| Node::parallel(slots, success, failure))
    }

    /// Decorator inverting the outcome of the next node.
    pub fn negate(&mut self) -> &mut Self {
        self.group(Node::negate(), 1)
    }

    /// Finalize the current definition.
    ///
    /// Fails if a defect was recorded mid-chain or declared child slots
    /// remain unfilled. Yields `None` when no node was ever added. On
    /// success the builder is ready to define the next tree on the same
    /// arena and scheduler.
    pub fn end(&mut self) -> Result<Option<BehaviorTree>, BuildError> {
        if let Some(defect) = self.defect.take() {
            self.reset();
            return Err(defect);
        }
        let Some(root) = self.root.take() else {
            self.reset();
            return Ok(None);
        };
        if let Some(group) = self.groups.last() {
            let defect = BuildError::UnfilledChildren {
                declared: group.declared,
                missing: group.declared - group.filled,
            };
            self.reset();
            return Err(defect);
        }
        self.reset();
        debug!(bytes = self.arena.borrow().size(), "behavior tree built");
        Ok(Some(BehaviorTree::new(
            root,
            Rc::clone(&self.arena),
            self.scheduler.clone(),
        )))
    }

    fn reset(&mut self) {
        self.root = None;
        self.groups.clear();
    }

    fn leaf(&mut self, node: Node) -> &mut Self {
        self.insert(node, None)
    }

    fn composite(&mut self, declared: u16, make: impl FnOnce(ChildSlots) -> Node) -> &mut Self {
        if self.defect.is_some() {
            return self;
        }
        if declared == 0 {
            self.defect = Some(BuildError::EmptyComposite);
            return self;
        }
        let allocation = self.arena.borrow_mut().allocate_children(declared);
        let slots = match allocation {
            Ok(slots) => slots,
            Err(err) => {
                self.defect = Some(err.into());
                return self;
            }
        };
        self.insert(make(slots), Some(declared))
    }

    fn group(&mut self, node: Node, declared: u16) -> &mut Self {
        self.insert(node, Some(declared))
    }

    fn insert(&mut self, node: Node, declared: Option<u16>) -> &mut Self {
        if self.defect.is_some() {
            return self;
        }
        let allocation = self.arena.borrow_mut().allocate(node);
        let id = match allocation {
            Ok(id) => id,
            Err(err) => {
                self.defect = Some(err.into());
                return self;
            }
        };
        self.attach(id);
        if let Some(declared) = declared {
            self.groups.push(Group {
                parent: id,
                declared,
                filled: 0,
            });
        }
        self
    }

    /// Wire a freshly allocated node into the tree: the first node becomes
    /// the root, everything after fills the innermost open group's next
    /// slot.
    fn attach(&mut self, id: NodeId) {
        if self.root.is_none() {
            self.root = Some(id);
            return;
        }
        let Some(group) = self.groups.last_mut() else {
            self.defect = Some(BuildError::OrphanNode);
            return;
        };
        let parent = group.parent;
        let index = group.filled;
        group.filled += 1;
        let closed = group.filled == group.declared;
        if closed {
            self.groups.pop();
        }

        let slots = {
            let guard = self.arena.borrow();
            match guard.node(parent).map(|node| node.behavior()) {
                Some(
                    Behavior::Sequence { children, .. }
                    | Behavior::Selector { children, .. }
                    | Behavior::Parallel { children, .. },
                ) => Some(*children),
                _ => None,
            }
        };
        match slots {
            Some(slots) => self.arena.borrow_mut().set_child(slots, index, id),
            None => {
                let mut guard = self.arena.borrow_mut();
                if let Some(node) = guard.node_mut(parent)
                    && let Behavior::Negate { child } = node.behavior_mut()
                {
                    *child = Some(id);
                }
            }
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
