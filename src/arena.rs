//! Arena storage for behavior tree nodes.
//!
//! One arena owns the memory of every node and child array belonging to the
//! trees built from it. Allocation is bump-style against a fixed byte
//! budget: the offset only ever grows, nothing is returned individually,
//! and a request that would exceed the budget fails before anything is
//! written. Nodes are destructed in place by the owning tree at teardown;
//! the backing storage is freed once when the last shared handle drops.
//!
//! Node counts and tree shape are fixed after construction, so ticking an
//! already-built tree never allocates.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::AllocationError;
use crate::node::Node;

/// Index of a node inside its [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A fixed-size range of child slots in the arena's child pool.
///
/// Slots are reserved unfilled at composite allocation time and populated
/// exactly once, left to right, during the build.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChildSlots {
    start: u32,
    count: u16,
}

impl ChildSlots {
    pub(crate) fn count(self) -> u16 {
        self.count
    }
}

pub(crate) struct Arena {
    nodes: Vec<Option<Node>>,
    children: Vec<Option<NodeId>>,
    used: usize,
    max_bytes: usize,
}

impl Arena {
    pub(crate) fn new(max_bytes: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(max_bytes / size_of::<Node>()),
            children: Vec::new(),
            used: 0,
            max_bytes,
        }
    }

    /// Bytes allocated so far. Never decreases.
    pub(crate) fn size(&self) -> usize {
        self.used
    }

    /// Charge `bytes` against the budget, strictly before any write.
    fn charge(&mut self, bytes: usize) -> Result<(), AllocationError> {
        if self.used + bytes > self.max_bytes {
            return Err(AllocationError {
                requested: bytes,
                used: self.used,
                max_bytes: self.max_bytes,
            });
        }
        self.used += bytes;
        Ok(())
    }

    pub(crate) fn allocate(&mut self, node: Node) -> Result<NodeId, AllocationError> {
        self.charge(size_of::<Node>())?;
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        Ok(id)
    }

    /// Reserve `count` unfilled child slots.
    pub(crate) fn allocate_children(&mut self, count: u16) -> Result<ChildSlots, AllocationError> {
        self.charge(size_of::<NodeId>() * count as usize)?;
        let start = self.children.len() as u32;
        self.children
            .resize(self.children.len() + count as usize, None);
        Ok(ChildSlots { start, count })
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(|slot| slot.as_ref())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(|slot| slot.as_mut())
    }

    pub(crate) fn child(&self, slots: ChildSlots, index: u16) -> Option<NodeId> {
        if index >= slots.count {
            return None;
        }
        self.children
            .get(slots.start as usize + index as usize)
            .copied()
            .flatten()
    }

    pub(crate) fn set_child(&mut self, slots: ChildSlots, index: u16, child: NodeId) {
        if index < slots.count
            && let Some(slot) = self.children.get_mut(slots.start as usize + index as usize)
        {
            *slot = Some(child);
        }
    }

    /// Destruct a node in place. The slot stays reserved (the arena never
    /// reuses memory) and releasing the same node twice is a no-op.
    pub(crate) fn release(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.get_mut(id.index()).and_then(|slot| slot.take())
    }
}

/// Shared handle to an arena. Trees built by one builder keep the same
/// arena alive; the storage goes away with the last handle.
pub(crate) type SharedArena = Rc<RefCell<Arena>>;

/// Weak, non-owning reference to a node: the currency of the scheduler
/// queue and of observer back-references. A dead handle simply stops
/// resolving, so nothing dangles after teardown.
#[derive(Clone)]
pub(crate) struct NodeRef {
    arena: Weak<RefCell<Arena>>,
    id: NodeId,
}

impl NodeRef {
    pub(crate) fn new(arena: &SharedArena, id: NodeId) -> Self {
        Self {
            arena: Rc::downgrade(arena),
            id,
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn upgrade(&self) -> Option<SharedArena> {
        self.arena.upgrade()
    }

    /// A reference to another node in the same arena.
    pub(crate) fn sibling(&self, id: NodeId) -> Self {
        Self {
            arena: self.arena.clone(),
            id,
        }
    }

    pub(crate) fn same(&self, other: &NodeRef) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.arena, &other.arena)
    }
}
