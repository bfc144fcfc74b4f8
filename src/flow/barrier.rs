use std::sync::{Arc, Mutex, Weak};
use uuid::Uuid;

use crate::flow::generator::{Generator, GeneratorBase};
use crate::flow::transient::{CompletionListener, Transient};
use crate::kernel::AsyncKernel;
use crate::logger::Logger;

/// Completes when *all* added transients complete. Has no own step
/// behavior beyond membership maintenance: a fire-once listener
/// installed at `add()` removes the member on its completion and, once
/// the set is empty, completes the barrier.
///
/// An empty-on-creation barrier stays active; it only completes through
/// an add-and-drain cycle, or an explicit `complete()`.
pub struct Barrier {
    base: GeneratorBase,
    members: Mutex<Vec<Arc<dyn Transient>>>,
}

impl Barrier {
    pub fn new() -> Self {
        Self {
            base: GeneratorBase::new(),
            members: Mutex::new(Vec::new()),
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            base: GeneratorBase::with_name(name),
            members: Mutex::new(Vec::new()),
        }
    }

    /// If `child` is already inactive, it is not added. Otherwise a
    /// fire-once listener removes it from the barrier on completion, and
    /// if that drains the set, completes the barrier.
    pub fn add(self: &Arc<Self>, child: Arc<dyn Transient>) {
        if !self.base.transient().is_active() {
            return;
        }
        if !child.is_active() {
            return;
        }

        self.members.lock().unwrap().push(child.clone());
        let this = Arc::clone(self);
        let id = child.id();
        child.on_completed(Box::new(move || this.on_member_completed(id)));
    }

    fn on_member_completed(&self, id: Uuid) {
        let mut members = self.members.lock().unwrap();
        members.retain(|m| m.id() != id);
        let empty = members.is_empty();
        drop(members);
        if empty {
            self.complete();
        }
    }

    pub fn len(&self) -> usize {
        self.members.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Barrier {
    fn default() -> Self {
        Self::new()
    }
}

impl Transient for Barrier {
    fn id(&self) -> Uuid {
        self.base.transient().id()
    }

    fn name(&self) -> Option<String> {
        self.base.transient().name()
    }

    fn set_name(&mut self, name: String) {
        self.base.transient().set_name(name);
    }

    fn set_verbosity(&mut self, verbosity: u8) {
        self.base.transient_mut().set_verbosity(verbosity);
    }

    fn is_active(&self) -> bool {
        self.base.transient().is_active()
    }

    fn logger(&self) -> &Logger {
        self.base.transient().logger()
    }

    fn kernel(&self) -> Option<Arc<AsyncKernel>> {
        self.base.transient().kernel()
    }

    fn set_kernel(&self, kernel: Weak<AsyncKernel>) {
        self.base.transient().set_kernel(kernel);
    }

    fn complete(&self) {
        self.base.transient().complete();
    }

    fn on_completed(&self, listener: CompletionListener) {
        self.base.transient().on_completed(listener);
    }
}

impl Generator for Barrier {
    fn is_running(&self) -> bool {
        self.base.is_running()
    }

    fn suspend(&self) {
        self.base.suspend();
    }

    fn resume(&self) {
        self.base.resume();
    }

    fn step_number(&self) -> u64 {
        self.base.step_number()
    }

    fn bind_self(&self, handle: Weak<dyn Generator>) {
        self.base.bind_self(handle);
    }

    /// Membership is entirely listener-driven; stepping a barrier never
    /// does anything on its own.
    fn step(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::future::Future as FlowFuture;

    #[test]
    fn completes_only_once_every_member_completes() {
        let barrier = Arc::new(Barrier::new());
        let f1: Arc<FlowFuture<bool>> = Arc::new(FlowFuture::new());
        let f2: Arc<FlowFuture<bool>> = Arc::new(FlowFuture::new());
        let f3: Arc<FlowFuture<bool>> = Arc::new(FlowFuture::new());
        barrier.add(f1.clone());
        barrier.add(f2.clone());
        barrier.add(f3.clone());

        assert!(barrier.is_active());
        f2.set_value(true);
        assert!(barrier.is_active());
        f1.set_value(true);
        assert!(barrier.is_active());
        f3.set_value(true);
        assert!(!barrier.is_active());
    }

    #[test]
    fn empty_barrier_stays_active_until_explicitly_completed() {
        let barrier = Arc::new(Barrier::new());
        assert!(barrier.is_active());
        barrier.complete();
        assert!(!barrier.is_active());
    }

    #[test]
    fn already_inactive_child_is_not_added() {
        let barrier = Arc::new(Barrier::new());
        let done: Arc<FlowFuture<bool>> = Arc::new(FlowFuture::new());
        done.set_value(true);
        barrier.add(done);
        assert_eq!(barrier.len(), 0);
        assert!(barrier.is_active());
    }
}
