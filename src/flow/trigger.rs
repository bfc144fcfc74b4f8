use std::sync::{Arc, Mutex, Weak};
use uuid::Uuid;

use crate::flow::generator::{Generator, GeneratorBase};
use crate::flow::transient::{CompletionListener, Transient};
use crate::kernel::AsyncKernel;
use crate::logger::Logger;

/// The dual of `Barrier`: completes when the *first* member completes.
/// Remaining members are not force-completed; they
/// continue to live independently. Membership additions after the
/// trigger has completed are no-ops.
pub struct Trigger {
    base: GeneratorBase,
    members: Mutex<Vec<Arc<dyn Transient>>>,
}

impl Trigger {
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

    /// An already-inactive child trivially satisfies "first to complete",
    /// so adding one completes the trigger immediately.
    pub fn add(self: &Arc<Self>, child: Arc<dyn Transient>) {
        if !self.base.transient().is_active() {
            return;
        }
        if !child.is_active() {
            self.complete();
            return;
        }

        self.members.lock().unwrap().push(child.clone());
        let this = Arc::clone(self);
        child.on_completed(Box::new(move || this.complete()));
    }

    pub fn len(&self) -> usize {
        self.members.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}

impl Transient for Trigger {
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

impl Generator for Trigger {
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

    /// Membership is entirely listener-driven; stepping a trigger never
    /// does anything on its own.
    fn step(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::future::Future as FlowFuture;

    #[test]
    fn completes_on_the_first_member_and_leaves_the_rest_alone() {
        let trigger = Arc::new(Trigger::new());
        let f1: Arc<FlowFuture<bool>> = Arc::new(FlowFuture::new());
        let f2: Arc<FlowFuture<bool>> = Arc::new(FlowFuture::new());
        let f3: Arc<FlowFuture<bool>> = Arc::new(FlowFuture::new());
        trigger.add(f1.clone());
        trigger.add(f2.clone());
        trigger.add(f3.clone());

        f2.set_value(true);

        assert!(!trigger.is_active());
        assert!(Transient::is_active(f1.as_ref()));
        assert!(Transient::is_active(f3.as_ref()));
    }

    #[test]
    fn additions_after_completion_are_no_ops() {
        let trigger = Arc::new(Trigger::new());
        trigger.complete();
        let f: Arc<FlowFuture<bool>> = Arc::new(FlowFuture::new());
        trigger.add(f.clone());
        assert_eq!(trigger.len(), 0);
        assert!(Transient::is_active(f.as_ref()));
    }
}
