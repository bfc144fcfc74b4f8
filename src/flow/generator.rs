use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::flow::transient::{Transient, TransientBase};

/// A transient that can be stepped. Adds the running/suspended flag and
/// the step counter to `Transient`.
pub trait Generator: Transient {
    fn is_running(&self) -> bool;
    fn suspend(&self);
    fn resume(&self);
    fn step_number(&self) -> u64;
    /// Performs one unit of work if `active && running`. A no-op
    /// otherwise, and a no-op never advances `step_number`.
    fn step(&self);
    /// Binds a weak handle to the owning `Arc<dyn Generator>`. The
    /// factory calls this right after construction.
    fn bind_self(&self, handle: Weak<dyn Generator>);
}

/// Shared state backing every `Generator`. Every composite in this crate
/// embeds one of these.
pub struct GeneratorBase {
    transient: TransientBase,
    running: AtomicBool,
    step_number: AtomicU64,
    self_handle: Mutex<Option<Weak<dyn Generator>>>,
}

impl GeneratorBase {
    pub fn new() -> Self {
        Self {
            transient: TransientBase::new(),
            running: AtomicBool::new(true),
            step_number: AtomicU64::new(0),
            self_handle: Mutex::new(None),
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            transient: TransientBase::with_name(name),
            running: AtomicBool::new(true),
            step_number: AtomicU64::new(0),
            self_handle: Mutex::new(None),
        }
    }

    pub fn transient(&self) -> &TransientBase {
        &self.transient
    }

    pub fn transient_mut(&mut self) -> &mut TransientBase {
        &mut self.transient
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn suspend(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn resume(&self) {
        if self.transient.is_active() {
            self.running.store(true, Ordering::Release);
        }
    }

    pub fn step_number(&self) -> u64 {
        self.step_number.load(Ordering::Relaxed)
    }

    pub fn record_step(&self) {
        self.step_number.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns whether the caller should proceed with its own step logic.
    /// Every composite's `step()` opens with `if !self.base.should_step()
    /// { return; }`.
    pub fn should_step(&self) -> bool {
        self.transient.is_active() && self.is_running()
    }

    /// Binds a weak handle to the owning `Arc<dyn Generator>`, so a
    /// generator can schedule its own resumption from inside its own
    /// `step()` (used by `Coroutine` when it suspends on an awaited
    /// dependency). The factory does this right after construction.
    pub fn bind_self(&self, handle: Weak<dyn Generator>) {
        *self.self_handle.lock().unwrap() = Some(handle);
    }

    pub fn self_handle(&self) -> Option<Arc<dyn Generator>> {
        self.self_handle.lock().unwrap().as_ref().and_then(Weak::upgrade)
    }
}

impl Default for GeneratorBase {
    fn default() -> Self {
        Self::new()
    }
}

/// `resume_after(other)`: atomically suspends `target`, then resumes it
/// once `other` completes (or immediately, if `other` is already
/// inactive; `on_completed` already implements that half).
pub fn resume_after(target: Arc<dyn Generator>, other: Arc<dyn Transient>) {
    target.suspend();
    let t = target;
    other.on_completed(Box::new(move || t.resume()));
}

/// The dual of `resume_after`: `target` suspends once `other` completes.
pub fn suspend_after(target: Arc<dyn Generator>, other: Arc<dyn Transient>) {
    let t = target;
    other.on_completed(Box::new(move || t.suspend()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspend_and_resume_are_idempotent() {
        let base = GeneratorBase::new();
        assert!(base.is_running());
        base.suspend();
        base.suspend();
        assert!(!base.is_running());
        base.resume();
        base.resume();
        assert!(base.is_running());
    }

    #[test]
    fn resume_is_a_no_op_once_inactive() {
        let base = GeneratorBase::new();
        base.suspend();
        base.transient().complete();
        base.resume();
        assert!(!base.is_running());
    }

    #[test]
    fn step_is_a_no_op_guard_when_suspended_or_inactive() {
        let base = GeneratorBase::new();
        assert!(base.should_step());
        base.suspend();
        assert!(!base.should_step());
        base.resume();
        base.transient().complete();
        assert!(!base.should_step());
    }
}
