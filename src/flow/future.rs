use std::sync::{Arc, Mutex, Weak};
use uuid::Uuid;

use crate::flow::generator::{Generator, GeneratorBase};
use crate::flow::transient::{CompletionListener, Transient};
use crate::kernel::AsyncKernel;
use crate::logger::Logger;

/// A single-value slot with waiters. Assigning the
/// value (exactly once) completes the future. Reading while unavailable
/// returns `T::default()`. This is a cooperative system, reads never
/// block.
pub struct Future<T> {
    base: GeneratorBase,
    value: Mutex<Option<T>>,
    notify: Arc<tokio::sync::Notify>,
}

impl<T: Send + 'static> Future<T> {
    pub fn new() -> Self {
        Self {
            base: GeneratorBase::new(),
            value: Mutex::new(None),
            notify: Arc::new(tokio::sync::Notify::new()),
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            base: GeneratorBase::with_name(name),
            value: Mutex::new(None),
            notify: Arc::new(tokio::sync::Notify::new()),
        }
    }

    /// Assigns the slot. A no-op past the first call, mirroring
    /// `complete()`'s idempotence.
    pub fn set_value(&self, value: T) {
        let mut slot = self.value.lock().unwrap();
        if slot.is_some() {
            return;
        }
        *slot = Some(value);
        drop(slot);
        self.notify.notify_waiters();
        self.complete();
    }

    pub fn is_available(&self) -> bool {
        self.value.lock().unwrap().is_some()
    }

    pub fn take(&self) -> Option<T> {
        self.value.lock().unwrap().take()
    }

    /// Returns the value, or `T::default()` if it hasn't been assigned
    /// yet. Never blocks.
    pub fn get(&self) -> T
    where
        T: Clone + Default,
    {
        self.value.lock().unwrap().clone().unwrap_or_default()
    }

    /// Convenience sugar for application code running outside the
    /// kernel's own step loop: blocks the calling async task (not the
    /// kernel) until the value is assigned. Not part of the core
    /// contract; the core never blocks.
    pub async fn wait(&self) -> T
    where
        T: Clone,
    {
        loop {
            if let Some(value) = self.value.lock().unwrap().clone() {
                return value;
            }
            self.notify.notified().await;
        }
    }
}

impl<T: Send + 'static> Default for Future<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Transient for Future<T> {
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

impl<T: Send + Sync + 'static> Generator for Future<T> {
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

    /// A future never needs stepping: it completes purely through
    /// `set_value`.
    fn step(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_exactly_once_on_assignment() {
        let future = Future::<u32>::new();
        assert!(!future.is_available());
        future.set_value(42);
        assert!(future.is_available());
        assert!(!future.is_active());
        future.set_value(99);
        assert_eq!(future.get(), 42);
    }

    #[test]
    fn unavailable_read_returns_default() {
        let future = Future::<u32>::new();
        assert_eq!(future.get(), 0);
    }
}
