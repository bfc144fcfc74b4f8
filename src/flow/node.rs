use std::sync::{Arc, Mutex, Weak};
use uuid::Uuid;

use crate::flow::generator::{Generator, GeneratorBase};
use crate::flow::transient::{CompletionListener, Transient};
use crate::kernel::AsyncKernel;
use crate::logger::Logger;

/// An unordered bag of child generators, stepped each tick. Completes
/// only if explicitly completed; children are
/// removed from the bag as they complete.
pub struct Node {
    base: GeneratorBase,
    children: Mutex<Vec<Arc<dyn Generator>>>,
}

impl Node {
    pub fn new() -> Self {
        Self {
            base: GeneratorBase::new(),
            children: Mutex::new(Vec::new()),
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            base: GeneratorBase::with_name(name),
            children: Mutex::new(Vec::new()),
        }
    }

    pub fn add_child(&self, child: Arc<dyn Generator>) {
        self.children.lock().unwrap().push(child);
    }

    pub fn remove_child(&self, id: Uuid) -> bool {
        let mut children = self.children.lock().unwrap();
        if let Some(pos) = children.iter().position(|c| c.id() == id) {
            children.remove(pos);
            return true;
        }
        false
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().unwrap().len()
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl Transient for Node {
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

impl Generator for Node {
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

    /// A snapshot of the active children is taken before iterating, so
    /// completion-driven removal during the loop cannot invalidate
    /// traversal, and children added mid-iteration are deferred to the
    /// next step.
    fn step(&self) {
        if !self.base.should_step() {
            return;
        }

        let snapshot: Vec<Arc<dyn Generator>> = self.children.lock().unwrap().clone();
        if snapshot.is_empty() {
            return;
        }

        self.logger()
            .verbose(4, format!("stepping node with {} children", snapshot.len()));

        for child in &snapshot {
            if child.is_active() && child.is_running() {
                child.step();
            }
        }

        self.base.record_step();
        self.children.lock().unwrap().retain(|c| c.is_active());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::future::Future as FlowFuture;

    #[test]
    fn removes_children_as_they_complete() {
        let node = Node::new();
        let f1: Arc<FlowFuture<u32>> = Arc::new(FlowFuture::new());
        let f2: Arc<FlowFuture<u32>> = Arc::new(FlowFuture::new());
        node.add_child(f1.clone());
        node.add_child(f2.clone());
        assert_eq!(node.child_count(), 2);

        f1.set_value(1);
        node.step();
        assert_eq!(node.child_count(), 1);
    }
}
