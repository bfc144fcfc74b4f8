use std::future::Future as StdFuture;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::flow::*;
use crate::kernel::AsyncKernel;

/// Constructs flow objects bound to a particular kernel: every object it
/// hands back already carries the kernel's `Weak` back-reference and the
/// kernel's configured log verbosity. One instance per kernel, rather
/// than a bag of bare statics, since attaching the kernel reference
/// needs kernel state to attach to.
#[derive(Clone)]
pub struct FlowFactory {
    kernel: Weak<AsyncKernel>,
    verbosity: u8,
}

impl FlowFactory {
    pub(crate) fn new(kernel: Weak<AsyncKernel>, verbosity: u8) -> Self {
        Self { kernel, verbosity }
    }

    /// Applies this factory's verbosity, sets the kernel back-reference,
    /// and, for types that need to schedule their own resumption
    /// (`Coroutine`), binds the self handle. Every constructor below
    /// routes through this.
    fn attach<T: Generator + 'static>(&self, mut value: T) -> Arc<T> {
        value.set_verbosity(self.verbosity);
        let arc = Arc::new(value);
        arc.set_kernel(self.kernel.clone());
        let weak: Weak<dyn Generator> = Arc::downgrade(&arc) as Weak<dyn Generator>;
        arc.bind_self(weak);
        arc
    }

    /// Adds `child` directly under the kernel's root, and returns it.
    /// The common case of "run this until it completes".
    pub fn make_root_bound<T: Generator + 'static>(&self, child: Arc<T>) -> Arc<T> {
        if let Some(kernel) = self.kernel.upgrade() {
            kernel.root().add_child(child.clone());
        }
        child
    }

    pub fn node(&self) -> Arc<Node> {
        self.attach(Node::new())
    }

    pub fn node_named(&self, name: impl Into<String>) -> Arc<Node> {
        self.attach(Node::with_name(name))
    }

    pub fn group(&self) -> Arc<Group> {
        self.attach(Group::new())
    }

    pub fn group_named(&self, name: impl Into<String>) -> Arc<Group> {
        self.attach(Group::with_name(name))
    }

    pub fn sequence(&self) -> Arc<Sequence> {
        self.attach(Sequence::new())
    }

    pub fn sequence_named(&self, name: impl Into<String>) -> Arc<Sequence> {
        self.attach(Sequence::with_name(name))
    }

    pub fn barrier(&self) -> Arc<Barrier> {
        self.attach(Barrier::new())
    }

    pub fn barrier_named(&self, name: impl Into<String>) -> Arc<Barrier> {
        self.attach(Barrier::with_name(name))
    }

    pub fn trigger(&self) -> Arc<Trigger> {
        self.attach(Trigger::new())
    }

    pub fn trigger_named(&self, name: impl Into<String>) -> Arc<Trigger> {
        self.attach(Trigger::with_name(name))
    }

    pub fn timer(&self, duration: Duration) -> Arc<Timer> {
        self.attach(Timer::new(duration))
    }

    pub fn timer_named(&self, name: impl Into<String>, duration: Duration) -> Arc<Timer> {
        self.attach(Timer::with_name(name, duration))
    }

    pub fn periodic(&self, interval: Duration) -> Arc<Periodic> {
        self.attach(Periodic::new(interval))
    }

    pub fn periodic_named(&self, name: impl Into<String>, interval: Duration) -> Arc<Periodic> {
        self.attach(Periodic::with_name(name, interval))
    }

    pub fn future<T: Send + Sync + 'static>(&self) -> Arc<Future<T>> {
        self.attach(Future::new())
    }

    pub fn future_named<T: Send + Sync + 'static>(&self, name: impl Into<String>) -> Arc<Future<T>> {
        self.attach(Future::with_name(name))
    }

    pub fn coroutine<T, F>(&self, producer: F) -> Arc<Coroutine<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> LazySeq<T> + Send + 'static,
    {
        self.attach(Coroutine::new(producer))
    }

    pub fn coroutine_named<T, F>(&self, name: impl Into<String>, producer: F) -> Arc<Coroutine<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> LazySeq<T> + Send + 'static,
    {
        self.attach(Coroutine::with_name(name, producer))
    }

    pub fn subroutine<T, F>(&self, action: F) -> Arc<Subroutine<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.attach(Subroutine::new(action))
    }

    pub fn async_coroutine<F>(&self, future: F) -> Arc<AsyncCoroutine>
    where
        F: StdFuture<Output = crate::Result<()>> + Send + 'static,
    {
        self.attach(AsyncCoroutine::new(future))
    }

    pub fn async_coroutine_named<F>(&self, name: impl Into<String>, future: F) -> Arc<AsyncCoroutine>
    where
        F: StdFuture<Output = crate::Result<()>> + Send + 'static,
    {
        self.attach(AsyncCoroutine::with_name(name, future))
    }

    /// `TimedBarrier`/`TimedTrigger`/`TimedFuture` are each built with
    /// `Arc::new_cyclic` internally (they hold their own internal
    /// `Trigger`/`Timer` race), so they are attached after construction
    /// rather than through `attach`'s `Arc::new`. Verbosity is still
    /// applied via `Arc::get_mut`, valid here because no other strong
    /// reference to the value exists yet.
    pub fn timed_barrier(&self, timeout: Duration) -> Arc<TimedBarrier> {
        let mut value = TimedBarrier::new(timeout);
        if let Some(unique) = Arc::get_mut(&mut value) {
            unique.set_verbosity(self.verbosity);
        }
        value.set_kernel(self.kernel.clone());
        value
    }

    pub fn timed_trigger(&self, timeout: Duration) -> Arc<TimedTrigger> {
        let mut value = TimedTrigger::new(timeout);
        if let Some(unique) = Arc::get_mut(&mut value) {
            unique.set_verbosity(self.verbosity);
        }
        value.set_kernel(self.kernel.clone());
        value
    }

    pub fn timed_future<T: Send + Sync + 'static>(&self, timeout: Duration) -> Arc<TimedFuture<T>> {
        let mut value = TimedFuture::new(timeout);
        if let Some(unique) = Arc::get_mut(&mut value) {
            unique.set_verbosity(self.verbosity);
        }
        value.set_kernel(self.kernel.clone());
        value
    }
}

/// Fluent naming sugar for freshly-built `Arc<T>`s. Only effective
/// immediately after construction, before any other strong reference has
/// been cloned.
pub trait FlowExtensions {
    fn named(self, name: impl Into<String>) -> Self;
}

impl<T: Generator> FlowExtensions for Arc<T> {
    fn named(mut self, name: impl Into<String>) -> Self {
        if let Some(generator) = Arc::get_mut(&mut self) {
            generator.set_name(name.into());
        }
        self
    }
}
