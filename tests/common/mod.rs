//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use behavior_tree::Status;

/// Observable lifecycle counters for a scripted leaf.
#[derive(Default)]
pub struct Probe {
    pub updates: Cell<u32>,
    pub drops: Cell<u32>,
}

pub fn probe() -> Rc<Probe> {
    Rc::new(Probe::default())
}

/// Owned by a scripted closure; counts the closure's destruction, which
/// happens exactly when the node is destructed.
pub struct DropGuard(Rc<Probe>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.drops.set(self.0.drops.get() + 1);
    }
}

/// A leaf callable that plays `script` front to back, repeating the last
/// status, while counting updates and its own destruction.
pub fn scripted(probe: &Rc<Probe>, script: &[Status]) -> impl FnMut() -> Status + 'static {
    let probe = Rc::clone(probe);
    let guard = DropGuard(Rc::clone(&probe));
    let script = script.to_vec();
    let mut index = 0usize;
    move || {
        let _ = &guard;
        probe.updates.set(probe.updates.get() + 1);
        let status = script[index];
        if index + 1 < script.len() {
            index += 1;
        }
        status
    }
}
