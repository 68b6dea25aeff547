//! Async actions and subtree composition.

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use behavior_tree::{AsyncHandle, Builder, ParallelPolicy, Status};
use common::{probe, scripted};

type HandleSlot = Rc<RefCell<Option<AsyncHandle>>>;

fn capture(slot: &HandleSlot) -> impl FnMut(AsyncHandle) + 'static {
    let slot = Rc::clone(slot);
    move |handle| {
        *slot.borrow_mut() = Some(handle);
    }
}

#[test]
fn async_action_suspends_until_resolved() {
    let slot: HandleSlot = Rc::default();
    let mut builder = Builder::new();
    let tree = builder
        .async_action("fetch path", capture(&slot))
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(tree.tick(), Status::Suspended);
    // Nothing to do while in flight; the node is parked, not polled.
    assert_eq!(tree.tick(), Status::Suspended);

    slot.borrow().as_ref().unwrap().succeeded();
    assert_eq!(tree.status(), Status::Success);
}

#[test]
fn async_action_can_fail() {
    let slot: HandleSlot = Rc::default();
    let mut builder = Builder::new();
    let tree = builder
        .async_action("fetch path", capture(&slot))
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(tree.tick(), Status::Suspended);
    slot.borrow().as_ref().unwrap().failed();
    assert_eq!(tree.status(), Status::Failure);
}

#[test]
fn async_action_resolves_at_most_once_per_activation() {
    let slot: HandleSlot = Rc::default();
    let mut builder = Builder::new();
    let tree = builder
        .async_action("fetch path", capture(&slot))
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(tree.tick(), Status::Suspended);
    let handle = slot.borrow().as_ref().unwrap().clone();
    handle.succeeded();
    handle.failed();

    assert_eq!(tree.status(), Status::Success);
}

#[test]
fn resolution_before_suspension_is_ignored() {
    let mut builder = Builder::new();
    let tree = builder
        .async_action("eager", |handle: AsyncHandle| {
            // Resolving from inside the start callback is premature: the
            // node has not suspended yet.
            handle.succeeded();
        })
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(tree.tick(), Status::Suspended);
}

#[test]
fn async_action_restarts_on_next_activation() {
    let starts = Rc::new(Cell::new(0u32));
    let slot: HandleSlot = Rc::default();
    let on_start = {
        let starts = Rc::clone(&starts);
        let slot = Rc::clone(&slot);
        move |handle| {
            starts.set(starts.get() + 1);
            *slot.borrow_mut() = Some(handle);
        }
    };

    let mut builder = Builder::new();
    let tree = builder
        .async_action("fetch path", on_start)
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(tree.tick(), Status::Suspended);
    slot.borrow().as_ref().unwrap().succeeded();
    assert_eq!(starts.get(), 1);

    // Root completed, so the next round starts the action over.
    assert_eq!(tree.tick(), Status::Suspended);
    assert_eq!(starts.get(), 2);
}

#[test]
fn panicking_start_callback_fails_the_action() {
    let mut builder = Builder::new();
    let tree = builder
        .async_action("broken", |_handle: AsyncHandle| panic!("boom"))
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(tree.tick(), Status::Failure);
}

#[test]
fn sequence_resumes_after_async_completion() {
    let slot: HandleSlot = Rc::default();
    let p = probe();
    let mut builder = Builder::with_capacity(2048);
    let tree = builder
        .sequence(2)
        .async_action("reach target", capture(&slot))
        .action("strike", scripted(&p, &[Status::Success]))
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(tree.tick(), Status::Suspended);
    assert_eq!(p.updates.get(), 0);

    slot.borrow().as_ref().unwrap().succeeded();
    // The sequence advanced and queued the next child; it runs next round.
    assert_eq!(tree.status(), Status::Suspended);
    assert_eq!(tree.tick(), Status::Success);
    assert_eq!(p.updates.get(), 1);
}

#[test]
fn cancelled_async_action_gets_its_stop_callback() {
    let slot: HandleSlot = Rc::default();
    let stopped = Rc::new(Cell::new(false));
    let on_stop = {
        let stopped = Rc::clone(&stopped);
        move |_handle: AsyncHandle| stopped.set(true)
    };

    let mut builder = Builder::with_capacity(2048);
    let tree = builder
        .parallel(2, ParallelPolicy::RequireOne, ParallelPolicy::RequireAll)
        .async_action_with_stop("watch", capture(&slot), on_stop)
        .action("win", || Status::Success)
        .end()
        .unwrap()
        .unwrap();

    // The second child succeeds in the same round, which cancels the
    // suspended watcher.
    assert_eq!(tree.tick(), Status::Success);
    assert!(stopped.get());
}

// ----------------------------------------------------------------------------
// SubTree
// ----------------------------------------------------------------------------

#[test]
fn subtree_relays_completion_within_the_round() {
    let p = probe();
    let mut builder = Builder::with_capacity(2048);
    let inner = builder
        .action("attack", scripted(&p, &[Status::Success]))
        .end()
        .unwrap()
        .unwrap();
    let outer = builder
        .sequence(2)
        .subtree("Combat", &inner)
        .action("report", scripted(&p, &[Status::Success]))
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(outer.tick(), Status::Success);
    assert_eq!(p.updates.get(), 2);
}

#[test]
fn subtree_relays_failure() {
    let mut builder = Builder::with_capacity(2048);
    let inner = builder
        .condition("visible", || false)
        .end()
        .unwrap()
        .unwrap();
    let outer = builder
        .negate()
        .subtree("Spot", &inner)
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(outer.tick(), Status::Success);
}

#[test]
fn host_stays_suspended_while_embedded_async_runs() {
    let slot: HandleSlot = Rc::default();
    let mut builder = Builder::with_capacity(2048);
    let inner = builder
        .async_action("reach target", capture(&slot))
        .end()
        .unwrap()
        .unwrap();
    let outer = builder
        .sequence(1)
        .subtree("Travel", &inner)
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(outer.tick(), Status::Suspended);
    assert_eq!(inner.status(), Status::Suspended);

    slot.borrow().as_ref().unwrap().succeeded();
    // The completion relays through the subtree to the host without
    // another round.
    assert_eq!(outer.status(), Status::Success);
}

#[test]
fn stopping_the_host_cancels_the_embedded_tree() {
    let slot: HandleSlot = Rc::default();
    let stopped = Rc::new(Cell::new(false));
    let on_stop = {
        let stopped = Rc::clone(&stopped);
        move |_handle: AsyncHandle| stopped.set(true)
    };

    let mut builder = Builder::with_capacity(2048);
    let inner = builder
        .async_action_with_stop("reach target", capture(&slot), on_stop)
        .end()
        .unwrap()
        .unwrap();
    let outer = builder
        .sequence(1)
        .subtree("Travel", &inner)
        .end()
        .unwrap()
        .unwrap();

    assert_eq!(outer.tick(), Status::Suspended);
    outer.stop();

    assert!(stopped.get());
    assert_eq!(outer.status(), Status::Failure);
    assert_eq!(inner.status(), Status::Failure);
}
