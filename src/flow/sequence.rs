use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use uuid::Uuid;

use crate::flow::generator::{Generator, GeneratorBase};
use crate::flow::transient::{CompletionListener, Transient};
use crate::kernel::AsyncKernel;
use crate::logger::Logger;

/// A queue of children stepped one at a time, in order. Completes when
/// the queue drains. Children added mid-run are
/// appended.
pub struct Sequence {
    base: GeneratorBase,
    queue: Mutex<VecDeque<Arc<dyn Generator>>>,
}

impl Sequence {
    pub fn new() -> Self {
        Self {
            base: GeneratorBase::new(),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            base: GeneratorBase::with_name(name),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn add_child(&self, child: Arc<dyn Generator>) {
        self.queue.lock().unwrap().push_back(child);
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Transient for Sequence {
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

impl Generator for Sequence {
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

    /// Drains dead heads in a loop rather than by recursion, so a cascade
    /// of synchronously-completing children cannot grow the call stack.
    fn step(&self) {
        if !self.base.should_step() {
            return;
        }

        loop {
            let head = self.queue.lock().unwrap().front().cloned();
            let head = match head {
                None => {
                    self.complete();
                    return;
                }
                Some(head) => head,
            };

            if head.is_active() {
                head.step();
                self.base.record_step();
                return;
            }

            self.queue.lock().unwrap().pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::coroutine::{Coroutine, StepOutcome};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recording_step(log: Arc<Mutex<Vec<u32>>>, n: u32) -> Arc<Coroutine<()>> {
        Arc::new(Coroutine::new(move || {
            log.lock().unwrap().push(n);
            Box::new(std::iter::once(StepOutcome::Done(())))
        }))
    }

    #[test]
    fn drains_in_order_and_completes_when_empty() {
        let sequence = Sequence::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 1..=6u32 {
            sequence.add_child(recording_step(log.clone(), i));
        }

        for _ in 0..12 {
            if !sequence.is_active() {
                break;
            }
            sequence.step();
        }

        assert!(!sequence.is_active());
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn deeply_nested_children_do_not_overflow_the_stack() {
        let counter = Arc::new(AtomicUsize::new(0));
        let outer = Sequence::new();
        for _ in 0..2000 {
            let c = counter.clone();
            outer.add_child(Arc::new(Coroutine::new(move || {
                c.fetch_add(1, Ordering::Relaxed);
                Box::new(std::iter::once(StepOutcome::Done(())))
            })));
        }

        outer.step();
        assert!(counter.load(Ordering::Relaxed) >= 1);
    }
}
