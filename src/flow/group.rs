use std::sync::{Arc, Mutex, Weak};
use uuid::Uuid;

use crate::flow::generator::{Generator, GeneratorBase};
use crate::flow::transient::{CompletionListener, Transient};
use crate::kernel::AsyncKernel;
use crate::logger::Logger;

/// A non-stepping container used solely for lifetime bundling.
/// Membership is for iteration/inspection only: completing the
/// group does NOT force-complete its members.
pub struct Group {
    base: GeneratorBase,
    members: Mutex<Vec<Arc<dyn Transient>>>,
}

impl Group {
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

    pub fn add(&self, member: Arc<dyn Transient>) {
        self.members.lock().unwrap().push(member);
    }

    pub fn len(&self) -> usize {
        self.members.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn member_ids(&self) -> Vec<Uuid> {
        self.members.lock().unwrap().iter().map(|m| m.id()).collect()
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

impl Transient for Group {
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

impl Generator for Group {
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

    /// Groups never drive their members; they exist purely for lifetime
    /// bundling, so stepping one is always a no-op.
    fn step(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::future::Future as FlowFuture;

    #[test]
    fn completing_the_group_does_not_complete_members() {
        let group = Group::new();
        let member: Arc<FlowFuture<u32>> = Arc::new(FlowFuture::new());
        group.add(member.clone());
        group.complete();
        assert!(!group.is_active());
        assert!(Transient::is_active(member.as_ref()));
    }
}
