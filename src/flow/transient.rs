use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use uuid::Uuid;

use crate::kernel::AsyncKernel;
use crate::logger::Logger;

/// A one-shot completion handler. Fired at most once, then discarded.
pub type CompletionListener = Box<dyn FnOnce() + Send>;

/// The lifetime primitive. Every schedulable object in the kernel is a
/// transient.
pub trait Transient: Send + Sync {
    fn id(&self) -> Uuid;
    fn name(&self) -> Option<String>;
    fn set_name(&mut self, name: String);
    fn is_active(&self) -> bool;
    fn logger(&self) -> &Logger;
    fn kernel(&self) -> Option<Arc<AsyncKernel>>;
    /// Binds the kernel back-reference. The factory calls this right
    /// after construction; nothing else should need to.
    fn set_kernel(&self, kernel: Weak<AsyncKernel>);
    /// Applies the owning factory's verbosity to this object's logger.
    /// Called once, right after construction, before the value is shared
    /// behind an `Arc`. See `FlowFactory::attach`.
    fn set_verbosity(&mut self, verbosity: u8);
    /// Idempotent: the first active->inactive transition fires every
    /// registered listener exactly once, in registration order.
    fn complete(&self);
    /// Registers a one-shot handler for this transient's completion. If
    /// the transient is already inactive, the handler runs synchronously,
    /// right here.
    fn on_completed(&self, listener: CompletionListener);
}

/// Shared state backing every `Transient` implementor. Composites embed
/// one of these and delegate to it.
pub struct TransientBase {
    id: Uuid,
    name: Mutex<Option<String>>,
    active: AtomicBool,
    kernel: Mutex<Option<Weak<AsyncKernel>>>,
    listeners: Mutex<Vec<CompletionListener>>,
    logger: Logger,
}

impl TransientBase {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: Mutex::new(None),
            active: AtomicBool::new(true),
            kernel: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            logger: Logger::default(),
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        let base = Self::new();
        *base.name.lock().unwrap() = Some(name.into());
        base
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> Option<String> {
        self.name.lock().unwrap().clone()
    }

    pub fn set_name(&self, name: String) {
        *self.name.lock().unwrap() = Some(name);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger;
    }

    pub fn set_verbosity(&mut self, verbosity: u8) {
        self.logger.verbosity = verbosity;
    }

    pub fn set_kernel(&self, kernel: Weak<AsyncKernel>) {
        *self.kernel.lock().unwrap() = Some(kernel);
    }

    pub fn kernel(&self) -> Option<Arc<AsyncKernel>> {
        self.kernel.lock().unwrap().as_ref().and_then(Weak::upgrade)
    }

    pub fn on_completed(&self, listener: CompletionListener) {
        if !self.is_active() {
            listener();
            return;
        }
        self.listeners.lock().unwrap().push(listener);
    }

    pub fn complete(&self) {
        let was_active = self.active.swap(false, Ordering::AcqRel);
        if !was_active {
            return;
        }
        let listeners = std::mem::take(&mut *self.listeners.lock().unwrap());
        for listener in listeners {
            if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(listener)) {
                self.logger.error(format!(
                    "completion listener panicked: {}",
                    panic_message(payload)
                ));
            }
        }
    }
}

impl Default for TransientBase {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Sugar over `completed`: `other.complete()` eventually runs `target.complete()`.
/// If `other` is already inactive, fires immediately.
pub fn complete_after(target: Arc<dyn Transient>, other: Arc<dyn Transient>) {
    other.on_completed(Box::new(move || target.complete()));
}

/// Sugar over `completed` += a one-shot `action`, with automatic
/// unsubscription (the listener is dropped after it runs once).
pub fn then<F>(target: Arc<dyn Transient>, action: F)
where
    F: FnOnce() + Send + 'static,
{
    target.on_completed(Box::new(action));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn complete_is_idempotent_and_fires_once() {
        let base = TransientBase::new();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        base.on_completed(Box::new(move || {
            c.fetch_add(1, Ordering::Relaxed);
        }));
        assert!(base.is_active());
        base.complete();
        base.complete();
        base.complete();
        assert!(!base.is_active());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn on_completed_after_completion_fires_immediately() {
        let base = TransientBase::new();
        base.complete();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        base.on_completed(Box::new(move || {
            c.fetch_add(1, Ordering::Relaxed);
        }));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn listener_panic_does_not_block_later_listeners() {
        let base = TransientBase::new();
        let calls = Arc::new(AtomicU32::new(0));
        base.on_completed(Box::new(|| panic!("boom")));
        let c = calls.clone();
        base.on_completed(Box::new(move || {
            c.fetch_add(1, Ordering::Relaxed);
        }));
        base.complete();
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
