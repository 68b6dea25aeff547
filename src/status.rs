//! Status returned by behavior tree nodes.

use std::fmt;

/// The result of evaluating a node's lifecycle for one tick.
///
/// # Lifecycle
///
/// A node starts in `Initial`, is moved to one of the other states by the
/// scheduler each time it is ticked, and stays in `Success`/`Failure` until
/// its owner restarts it. `Suspended` parks the node for the current round;
/// it resumes when a child completes or an external callback resolves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The node has never been started (or was restarted and not yet ticked).
    Initial,

    /// The node did work this tick and wants to be ticked again next round.
    Running,

    /// The node completed successfully.
    ///
    /// For conditions: the condition was met.
    /// For actions: the action executed without errors.
    Success,

    /// The node failed.
    ///
    /// For conditions: the condition was not met.
    /// For actions: the action could not be executed, or was cancelled.
    Failure,

    /// The node yielded without a verdict. It is not re-queued; a child
    /// completion or an out-of-band callback resolves it later.
    Suspended,
}

impl Status {
    /// Returns `true` if this status is `Success`.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    /// Returns `true` if this status is `Failure`.
    #[inline]
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failure)
    }

    /// Returns `true` if the node is part of the active subtree, i.e. it is
    /// `Running` or `Suspended`.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, Status::Running | Status::Suspended)
    }

    /// Inverts the status: Success becomes Failure and vice versa.
    ///
    /// Every other status is left unchanged.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            other => other,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Initial => "Initial",
            Status::Running => "Running",
            Status::Success => "Success",
            Status::Failure => "Failure",
            Status::Suspended => "Suspended",
        };
        f.write_str(name)
    }
}
