//! Tree construction errors.

use thiserror::Error;

/// Arena capacity exceeded.
///
/// Raised when an allocation would push the arena past its byte budget.
/// The budget is checked before anything is written, so a failed
/// allocation leaves the arena contents untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("arena capacity exceeded: requested {requested} bytes with {used} of {max_bytes} in use")]
pub struct AllocationError {
    /// Size of the rejected request, in bytes.
    pub requested: usize,
    /// Bytes already allocated.
    pub used: usize,
    /// Total arena capacity.
    pub max_bytes: usize,
}

/// Malformed tree definition, reported by [`Builder::end`].
///
/// [`Builder::end`]: crate::Builder::end
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A node or child array did not fit in the arena.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// A composite or decorator declared more children than were added
    /// before `end` was called.
    #[error("tree definition left {missing} of {declared} declared child slots unfilled")]
    UnfilledChildren { declared: u16, missing: u16 },

    /// A node was added after the root finished, outside any open
    /// composite or decorator.
    #[error("node added outside any composite or decorator group")]
    OrphanNode,

    /// A composite declared zero children.
    #[error("composite declared zero children")]
    EmptyComposite,
}
