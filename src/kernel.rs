use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use uuid::Uuid;

use crate::config::KernelConfig;
use crate::factory::FlowFactory;
use crate::flow::generator::{Generator, GeneratorBase};
use crate::flow::node::Node;
use crate::flow::transient::{CompletionListener, Transient};
use crate::logger::Logger;
use crate::time_frame::TimeFrame;
use crate::Result;

/// The scheduler. Owns a single root `Node` and advances
/// it one step per `update(delta)` call; nothing here reads the wall
/// clock on its own. `run_until_complete`/`run_for` are the only
/// callers that do, and they exist purely as convenience for
/// applications that want a wall-clock-paced loop.
pub struct AsyncKernel {
    base: GeneratorBase,
    root: Arc<Node>,
    time_frame: Mutex<TimeFrame>,
    breaking: AtomicBool,
    wait_until: Mutex<Option<Duration>>,
    config: KernelConfig,
}

impl AsyncKernel {
    /// Builds the kernel together with the `FlowFactory` that constructs
    /// flow objects bound to it. Uses `Arc::new_cyclic` so every object
    /// the factory creates can hold a `Weak<AsyncKernel>` back-reference
    /// from birth. Composites never hold a strong ref to their kernel,
    /// only a weak one, so a kernel and its flow graph can't keep each
    /// other alive past their natural lifetime.
    pub fn new() -> (Arc<Self>, FlowFactory) {
        Self::with_config(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> (Arc<Self>, FlowFactory) {
        let verbosity = config.verbosity;
        let kernel = Arc::new_cyclic(|weak: &Weak<AsyncKernel>| {
            let root = Arc::new(Node::with_name("Root"));
            root.set_kernel(weak.clone());
            Self {
                base: GeneratorBase::with_name(
                    config.name.clone().unwrap_or_else(|| "AsyncKernel".to_string()),
                ),
                root,
                time_frame: Mutex::new(TimeFrame::new()),
                breaking: AtomicBool::new(false),
                wait_until: Mutex::new(None),
                config,
            }
        });
        let factory = FlowFactory::new(Arc::downgrade(&kernel), verbosity);
        (kernel, factory)
    }

    pub fn root(&self) -> Arc<Node> {
        self.root.clone()
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn time_frame(&self) -> TimeFrame {
        self.time_frame.lock().unwrap().clone()
    }

    /// Requests that the current (or next) `step()` be the last one.
    /// Reset by the caller; there is no automatic re-arm. The caller
    /// owns the flag's lifecycle.
    pub fn break_flow(&self) {
        self.breaking.store(true, Ordering::Release);
    }

    pub fn clear_break(&self) {
        self.breaking.store(false, Ordering::Release);
    }

    pub fn is_breaking(&self) -> bool {
        self.breaking.load(Ordering::Acquire)
    }

    /// Pauses stepping until `time >= now + duration`. The clock still
    /// advances every `update` call in the meantime; only the root's
    /// stepping is withheld. The deadline clears itself once reached.
    pub fn wait(&self, duration: Duration) {
        let now = self.time_frame.lock().unwrap().total();
        *self.wait_until.lock().unwrap() = Some(now + duration);
    }

    pub fn is_waiting(&self) -> bool {
        self.wait_until.lock().unwrap().is_some()
    }

    /// Advances the kernel's clock by `delta`, then invokes `step()`.
    pub fn update(&self, delta: Duration) {
        self.time_frame.lock().unwrap().advance(delta);
        self.step();
    }

    /// Steps the root once, unless breaking or still waiting out a
    /// `wait(duration)` deadline.
    pub fn step(&self) {
        if !self.should_step() || self.is_breaking() {
            return;
        }
        let now = self.time_frame.lock().unwrap().total();
        {
            let mut wait_until = self.wait_until.lock().unwrap();
            if let Some(deadline) = *wait_until {
                if now < deadline {
                    return;
                }
                *wait_until = None;
            }
        }
        let child_count = self.root.child_count();
        if child_count > 0 {
            self.logger()
                .verbose(4, format!("stepping kernel with {} root children", child_count));
        }
        self.base.record_step();
        self.root.step();
    }

    /// Wall-clock convenience loop: repeatedly updates with real elapsed
    /// time until the root has no more children or the kernel stops.
    /// Pure application sugar; the kernel's own contract never depends on
    /// real time.
    pub async fn run_until_complete(&self) -> Result<()> {
        let mut last = tokio::time::Instant::now();
        loop {
            if !self.is_running() || self.is_breaking() {
                break;
            }
            if self.root.child_count() == 0 {
                break;
            }
            let now = tokio::time::Instant::now();
            self.update(now.duration_since(last));
            last = now;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        Ok(())
    }

    pub async fn run_for(&self, duration: Duration) -> Result<()> {
        let start = tokio::time::Instant::now();
        let mut last = start;
        loop {
            if !self.is_running() || self.is_breaking() {
                break;
            }
            if start.elapsed() >= duration {
                break;
            }
            let now = tokio::time::Instant::now();
            self.update(now.duration_since(last));
            last = now;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        Ok(())
    }
}

impl Transient for AsyncKernel {
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
        None
    }

    fn set_kernel(&self, _kernel: Weak<AsyncKernel>) {
        // The kernel is the root of the back-reference graph; it never
        // has one of its own.
    }

    fn complete(&self) {
        self.base.transient().complete();
    }

    fn on_completed(&self, listener: CompletionListener) {
        self.base.transient().on_completed(listener);
    }
}

impl Generator for AsyncKernel {
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
        self.update(Duration::ZERO);
    }
}

impl AsyncKernel {
    fn should_step(&self) -> bool {
        self.base.should_step()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::future::Future as FlowFuture;

    #[test]
    fn update_steps_the_root_and_advances_the_clock() {
        let (kernel, factory) = AsyncKernel::new();
        let future: Arc<FlowFuture<u32>> = Arc::new(FlowFuture::new());
        factory.make_root_bound(future.clone());

        kernel.update(Duration::from_millis(16));
        assert_eq!(kernel.time_frame().total(), Duration::from_millis(16));

        future.set_value(7);
        kernel.update(Duration::from_millis(16));
        assert_eq!(kernel.root().child_count(), 0);
    }

    #[test]
    fn break_flow_halts_stepping_but_the_clock_still_advances() {
        let (kernel, factory) = AsyncKernel::new();
        let future: Arc<FlowFuture<u32>> = Arc::new(FlowFuture::new());
        factory.make_root_bound(future.clone());
        future.set_value(7);

        kernel.break_flow();
        kernel.update(Duration::from_millis(16));
        assert_eq!(kernel.time_frame().total(), Duration::from_millis(16));
        assert_eq!(kernel.root().child_count(), 1, "stepping was skipped, so the completed future was never reaped");

        kernel.clear_break();
        kernel.update(Duration::from_millis(16));
        assert_eq!(kernel.root().child_count(), 0);
    }

    #[test]
    fn wait_defers_stepping_until_the_deadline_but_the_clock_still_advances() {
        let (kernel, factory) = AsyncKernel::new();
        let future: Arc<FlowFuture<u32>> = Arc::new(FlowFuture::new());
        factory.make_root_bound(future.clone());
        future.set_value(7);

        kernel.wait(Duration::from_millis(50));
        kernel.update(Duration::from_millis(16));
        assert!(kernel.is_waiting());
        assert_eq!(kernel.root().child_count(), 1);

        kernel.update(Duration::from_millis(16));
        kernel.update(Duration::from_millis(16));
        assert!(kernel.is_waiting());

        kernel.update(Duration::from_millis(16));
        assert!(!kernel.is_waiting());
        assert_eq!(kernel.root().child_count(), 0);
    }
}
