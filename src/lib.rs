//! Cooperatively scheduled behavior tree library for game agents.
//!
//! Trees are built once into a fixed-capacity arena, then advanced tick by
//! tick by a single-threaded scheduler. A tick is one round: every active
//! node is evaluated exactly once, long-running work suspends and resumes
//! across rounds, and completions bubble to parents synchronously so
//! control flow (AND/OR/fan-out) advances within the same round.
//!
//! - **Deterministic rounds**: a round covers exactly the nodes queued at
//!   its start; freshly started children run first, depth-first
//! - **Suspend and resume**: actions may report `Running`, or suspend and
//!   be resolved later through an [`AsyncHandle`]
//! - **Arena-backed**: one byte budget owns every node for the lifetime of
//!   the tree; ticking never allocates
//! - **No threads**: cooperative, single-threaded, no locks
//!
//! # Architecture
//!
//! - [`Builder`]: fluent construction into a shared arena and scheduler
//! - [`BehaviorTree`]: root node + arena + scheduler, restartable
//! - [`Status`]: the five-state node lifecycle
//! - [`Scheduler`]: the round loop driving one or more trees
//! - Composites: Sequence (AND), Selector (OR), Parallel with
//!   [`ParallelPolicy`] completion rules
//! - [`Visitor`]: read-only traversal for external presentation
//!
//! # Example
//!
//! ```rust,ignore
//! use behavior_tree::{Builder, Status};
//!
//! let mut builder = Builder::new();
//! let patrol = builder
//!     .sequence(3)
//!     .action("GoToPointA", || Status::Success)
//!     .action("GoToPointB", || Status::Running)
//!     .action("GoToPointC", || Status::Success)
//!     .end()?
//!     .unwrap();
//!
//! while patrol.tick() == Status::Suspended {
//!     // the running leg resumes next round
//! }
//! ```

mod arena;
mod builder;
mod composite;
mod decorator;
mod error;
mod node;
mod scheduler;
mod status;
mod tree;
mod visitor;

pub use builder::Builder;
pub use composite::ParallelPolicy;
pub use error::{AllocationError, BuildError};
pub use node::{AsyncHandle, NodeKind};
pub use scheduler::Scheduler;
pub use status::Status;
pub use tree::BehaviorTree;
pub use visitor::{NodeView, Visitor};
