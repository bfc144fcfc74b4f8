use std::future::Future as StdFuture;
use std::sync::{Arc, Mutex, Weak};
use uuid::Uuid;

use crate::error::FlowError;
use crate::flow::generator::{Generator, GeneratorBase};
use crate::flow::transient::{CompletionListener, Transient};
use crate::kernel::AsyncKernel;
use crate::logger::Logger;
use crate::Result;

/// What a coroutine's lazy sequence yields each time it is pulled.
pub enum StepOutcome<T> {
    /// Pause; resume from here on the next step.
    Yield,
    /// Pause until `other` completes, then resume from here.
    Await(Arc<dyn Transient>),
    /// The coroutine is finished, with its final value.
    Done(T),
    /// The coroutine failed; it completes without producing a value.
    Fault(FlowError),
}

pub type LazySeq<T> = Box<dyn Iterator<Item = StepOutcome<T>> + Send>;

/// Adapts a lazily-built step sequence into a `Generator`. The producer
/// closure is not invoked at construction time; only the first `step()`
/// builds the sequence, so building a coroutine has no side effects
/// until it actually runs.
pub struct Coroutine<T> {
    base: GeneratorBase,
    producer: Mutex<Option<Box<dyn FnOnce() -> LazySeq<T> + Send>>>,
    sequence: Mutex<Option<LazySeq<T>>>,
    awaiting: Mutex<Option<Arc<dyn Transient>>>,
    value: Mutex<Option<T>>,
}

impl<T: Send + 'static> Coroutine<T> {
    pub fn new<F>(producer: F) -> Self
    where
        F: FnOnce() -> LazySeq<T> + Send + 'static,
    {
        Self {
            base: GeneratorBase::new(),
            producer: Mutex::new(Some(Box::new(producer))),
            sequence: Mutex::new(None),
            awaiting: Mutex::new(None),
            value: Mutex::new(None),
        }
    }

    pub fn with_name<F>(name: impl Into<String>, producer: F) -> Self
    where
        F: FnOnce() -> LazySeq<T> + Send + 'static,
    {
        Self {
            base: GeneratorBase::with_name(name),
            producer: Mutex::new(Some(Box::new(producer))),
            sequence: Mutex::new(None),
            awaiting: Mutex::new(None),
            value: Mutex::new(None),
        }
    }

    pub fn value(&self) -> Option<T>
    where
        T: Clone,
    {
        self.value.lock().unwrap().clone()
    }

    fn build_if_needed(&self) {
        let mut sequence = self.sequence.lock().unwrap();
        if sequence.is_some() {
            return;
        }
        if let Some(producer) = self.producer.lock().unwrap().take() {
            *sequence = Some(producer());
        }
    }
}

impl<T: Send + 'static> Transient for Coroutine<T> {
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

impl<T: Send + Sync + 'static> Generator for Coroutine<T> {
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

    fn step(&self) {
        if !self.base.transient().is_active() {
            return;
        }

        // A pending await is resolved before consulting the running flag:
        // it is what put the coroutine to sleep, and it is the only thing
        // allowed to wake it back up. Normally the registered listener from
        // the Await branch below already called resume() by the time this
        // runs again, so this is just cleanup; it also covers the case
        // where the coroutine is stepped directly, with no bound self
        // handle to register a listener against.
        if let Some(waited) = self.awaiting.lock().unwrap().clone() {
            if waited.is_active() {
                return;
            }
            *self.awaiting.lock().unwrap() = None;
            self.base.resume();
        } else if !self.base.is_running() {
            // Suspended for some other reason (an explicit suspend() or
            // suspend_after()). Honor it like any other generator.
            return;
        }

        self.build_if_needed();

        let next = {
            let mut sequence = self.sequence.lock().unwrap();
            sequence.as_mut().and_then(|s| s.next())
        };

        self.base.record_step();

        match next {
            None => self.complete(),
            Some(StepOutcome::Yield) => {}
            Some(StepOutcome::Await(other)) => {
                *self.awaiting.lock().unwrap() = Some(other.clone());
                self.base.suspend();
                // A suspended generator is skipped by its driver (a `Node`
                // only steps children where `is_active() && is_running()`),
                // so polling alone would never run again. Registering a
                // resume against the awaited transient's own completion is
                // what actually wakes it back up. Only possible once a
                // self handle has been bound, which the factory does for
                // every object it constructs.
                if let Some(self_arc) = self.base.self_handle() {
                    other.on_completed(Box::new(move || self_arc.resume()));
                }
            }
            Some(StepOutcome::Done(value)) => {
                *self.value.lock().unwrap() = Some(value);
                self.complete();
            }
            Some(StepOutcome::Fault(error)) => {
                self.logger().error(format!("coroutine faulted: {}", error));
                self.complete();
            }
        }
    }
}

/// A `Coroutine` that produces exactly one value from a plain closure,
/// computed lazily on its first (and only) step.
pub struct Subroutine<T> {
    inner: Coroutine<T>,
}

impl<T: Send + 'static> Subroutine<T> {
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self {
            inner: Coroutine::new(move || {
                Box::new(std::iter::once_with(move || StepOutcome::Done(action())))
            }),
        }
    }

    pub fn with_name<F>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self {
            inner: Coroutine::with_name(name, move || {
                Box::new(std::iter::once_with(move || StepOutcome::Done(action())))
            }),
        }
    }

    pub fn value(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.value()
    }
}

impl<T: Send + 'static> Transient for Subroutine<T> {
    fn id(&self) -> Uuid {
        self.inner.id()
    }

    fn name(&self) -> Option<String> {
        self.inner.name()
    }

    fn set_name(&mut self, name: String) {
        self.inner.set_name(name);
    }

    fn set_verbosity(&mut self, verbosity: u8) {
        self.inner.set_verbosity(verbosity);
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn logger(&self) -> &Logger {
        self.inner.logger()
    }

    fn kernel(&self) -> Option<Arc<AsyncKernel>> {
        self.inner.kernel()
    }

    fn set_kernel(&self, kernel: Weak<AsyncKernel>) {
        self.inner.set_kernel(kernel);
    }

    fn complete(&self) {
        self.inner.complete();
    }

    fn on_completed(&self, listener: CompletionListener) {
        self.inner.on_completed(listener);
    }
}

impl<T: Send + Sync + 'static> Generator for Subroutine<T> {
    fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    fn suspend(&self) {
        self.inner.suspend();
    }

    fn resume(&self) {
        self.inner.resume();
    }

    fn step_number(&self) -> u64 {
        self.inner.step_number()
    }

    fn bind_self(&self, handle: Weak<dyn Generator>) {
        self.inner.bind_self(handle);
    }

    fn step(&self) {
        self.inner.step();
    }
}

/// Bridges a `tokio` future into the synchronous `Generator` world: the
/// future runs on its own spawned task, and `step()` merely polls a
/// shared slot for its outcome. This is the one place the kernel's
/// otherwise fully synchronous core touches `tokio` directly.
pub struct AsyncCoroutine {
    base: GeneratorBase,
    outcome: Arc<Mutex<Option<Result<()>>>>,
}

impl AsyncCoroutine {
    pub fn new<F>(future: F) -> Self
    where
        F: StdFuture<Output = Result<()>> + Send + 'static,
    {
        let outcome = Arc::new(Mutex::new(None));
        let slot = outcome.clone();
        tokio::spawn(async move {
            let result = future.await;
            *slot.lock().unwrap() = Some(result);
        });
        Self {
            base: GeneratorBase::new(),
            outcome,
        }
    }

    pub fn with_name<F>(name: impl Into<String>, future: F) -> Self
    where
        F: StdFuture<Output = Result<()>> + Send + 'static,
    {
        let outcome = Arc::new(Mutex::new(None));
        let slot = outcome.clone();
        tokio::spawn(async move {
            let result = future.await;
            *slot.lock().unwrap() = Some(result);
        });
        Self {
            base: GeneratorBase::with_name(name),
            outcome,
        }
    }
}

impl Transient for AsyncCoroutine {
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

impl Generator for AsyncCoroutine {
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

    fn step(&self) {
        if !self.base.should_step() {
            return;
        }
        self.base.record_step();
        let outcome = self.outcome.lock().unwrap().take();
        if let Some(result) = outcome {
            if let Err(error) = result {
                self.logger().error(format!("async coroutine failed: {}", error));
            }
            self.complete();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::future::Future as FlowFuture;

    #[test]
    fn producer_is_not_invoked_until_first_step() {
        let invoked = Arc::new(Mutex::new(false));
        let flag = invoked.clone();
        let coroutine = Coroutine::new(move || {
            *flag.lock().unwrap() = true;
            Box::new(std::iter::once(StepOutcome::Done(1))) as LazySeq<i32>
        });
        assert!(!*invoked.lock().unwrap());
        coroutine.step();
        assert!(*invoked.lock().unwrap());
        assert_eq!(coroutine.value(), Some(1));
        assert!(!coroutine.is_active());
    }

    #[test]
    fn yields_pause_one_step_each() {
        let coroutine = Coroutine::new(|| {
            Box::new(vec![StepOutcome::Yield, StepOutcome::Yield, StepOutcome::Done(7)].into_iter())
                as LazySeq<i32>
        });
        coroutine.step();
        assert!(coroutine.is_active());
        coroutine.step();
        assert!(coroutine.is_active());
        coroutine.step();
        assert!(!coroutine.is_active());
        assert_eq!(coroutine.value(), Some(7));
    }

    #[test]
    fn await_suspends_until_the_awaited_transient_completes() {
        let flag: Arc<FlowFuture<bool>> = Arc::new(FlowFuture::new());
        let waited: Arc<dyn Transient> = flag.clone();
        let coroutine = Coroutine::new(move || {
            Box::new(vec![StepOutcome::Await(waited), StepOutcome::Done(true)].into_iter())
                as LazySeq<bool>
        });
        coroutine.step();
        assert!(coroutine.is_active());
        assert!(!coroutine.is_running(), "yielding a transient suspends the coroutine");
        let step_number = coroutine.step_number();

        coroutine.step();
        assert!(coroutine.is_active(), "should still be waiting on the future");
        assert_eq!(coroutine.step_number(), step_number, "a no-op step never advances the counter");

        flag.set_value(true);
        coroutine.step();
        assert!(coroutine.is_running());
        assert!(!coroutine.is_active());
    }

    #[test]
    fn subroutine_computes_its_value_lazily_and_once() {
        let calls = Arc::new(Mutex::new(0));
        let c = calls.clone();
        let sub = Subroutine::new(move || {
            *c.lock().unwrap() += 1;
            42
        });
        assert_eq!(*calls.lock().unwrap(), 0);
        sub.step();
        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(sub.value(), Some(42));
        sub.step();
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
