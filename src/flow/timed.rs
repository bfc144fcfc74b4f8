use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use uuid::Uuid;

use crate::flow::barrier::Barrier;
use crate::flow::generator::{Generator, GeneratorBase};
use crate::flow::timer::Timer;
use crate::flow::transient::{CompletionListener, Transient};
use crate::flow::trigger::Trigger;
use crate::kernel::AsyncKernel;
use crate::logger::Logger;

/// Races an inner primitive against a `Timer` through an internal
/// `Trigger`: whichever completes first wins, decided by a single
/// completion callback rather than two competing registrations. The
/// owning composite must still be stepped each tick so its private timer
/// advances. The raced primitive's own members are scheduled
/// independently, same as a bare `Barrier`/`Trigger`/`Future`.
struct Race {
    timer: Arc<Timer>,
    gate: Arc<Trigger>,
}

impl Race {
    /// `on_settled` fires once the race is decided, with `true` iff the
    /// timeout leg won. The caller uses that to force-complete its
    /// wrapped primitive and raise its own `timed_out` event.
    fn new(
        timeout: Duration,
        legs: Vec<Arc<dyn Transient>>,
        on_settled: impl FnOnce(bool) + Send + 'static,
    ) -> Self {
        let timer = Arc::new(Timer::new(timeout));
        let gate = Arc::new(Trigger::new());
        gate.add(timer.clone() as Arc<dyn Transient>);
        for leg in legs {
            gate.add(leg);
        }
        let timer_for_settle = timer.clone();
        gate.on_completed(Box::new(move || {
            on_settled(!timer_for_settle.is_active());
        }));
        Self { timer, gate }
    }

    fn advance(&self, delta: Duration) {
        self.timer.advance(delta);
    }

    fn timed_out(&self) -> bool {
        !self.timer.is_active()
    }
}

/// A `Barrier` that also completes if `timeout` elapses before every
/// member does. `timed_out()` tells the caller which leg won.
pub struct TimedBarrier {
    base: GeneratorBase,
    inner: Arc<Barrier>,
    race: Mutex<Option<Race>>,
    timed_out_listeners: Mutex<Vec<CompletionListener>>,
}

impl TimedBarrier {
    pub fn new(timeout: Duration) -> Arc<Self> {
        Self::build(GeneratorBase::new(), timeout)
    }

    pub fn with_name(name: impl Into<String>, timeout: Duration) -> Arc<Self> {
        Self::build(GeneratorBase::with_name(name), timeout)
    }

    fn build(base: GeneratorBase, timeout: Duration) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<TimedBarrier>| {
            let inner = Arc::new(Barrier::new());
            let weak = weak.clone();
            let race = Race::new(
                timeout,
                vec![inner.clone() as Arc<dyn Transient>],
                move |timed_out| {
                    if let Some(this) = weak.upgrade() {
                        if timed_out {
                            // Unmet work is abandoned: the wrapped
                            // primitive is force-completed alongside us.
                            this.inner.complete();
                            for listener in std::mem::take(&mut *this.timed_out_listeners.lock().unwrap()) {
                                listener();
                            }
                        }
                        this.complete();
                    }
                },
            );
            Self {
                base,
                inner,
                race: Mutex::new(Some(race)),
                timed_out_listeners: Mutex::new(Vec::new()),
            }
        })
    }

    pub fn add(&self, child: Arc<dyn Transient>) {
        self.inner.add(child);
    }

    /// True if the timeout won the race; false if every member completed
    /// in time.
    pub fn timed_out(&self) -> bool {
        self.race
            .lock()
            .unwrap()
            .as_ref()
            .map(Race::timed_out)
            .unwrap_or(false)
    }

    /// Registers a fire-once handler for the `timed_out` event. Runs
    /// synchronously if the race has already timed out.
    pub fn on_timed_out(&self, listener: CompletionListener) {
        if self.timed_out() {
            listener();
            return;
        }
        self.timed_out_listeners.lock().unwrap().push(listener);
    }
}

impl Transient for TimedBarrier {
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

impl Generator for TimedBarrier {
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
        let delta = self
            .kernel()
            .map(|k| k.time_frame().delta())
            .unwrap_or(Duration::ZERO);
        if let Some(race) = self.race.lock().unwrap().as_ref() {
            race.advance(delta);
        }
        self.base.record_step();
    }
}

/// A `Trigger` that also completes if `timeout` elapses before any
/// member does.
pub struct TimedTrigger {
    base: GeneratorBase,
    inner: Arc<Trigger>,
    race: Mutex<Option<Race>>,
    timed_out_listeners: Mutex<Vec<CompletionListener>>,
}

impl TimedTrigger {
    pub fn new(timeout: Duration) -> Arc<Self> {
        Self::build(GeneratorBase::new(), timeout)
    }

    pub fn with_name(name: impl Into<String>, timeout: Duration) -> Arc<Self> {
        Self::build(GeneratorBase::with_name(name), timeout)
    }

    fn build(base: GeneratorBase, timeout: Duration) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<TimedTrigger>| {
            let inner = Arc::new(Trigger::new());
            let weak = weak.clone();
            let race = Race::new(
                timeout,
                vec![inner.clone() as Arc<dyn Transient>],
                move |timed_out| {
                    if let Some(this) = weak.upgrade() {
                        if timed_out {
                            this.inner.complete();
                            for listener in std::mem::take(&mut *this.timed_out_listeners.lock().unwrap()) {
                                listener();
                            }
                        }
                        this.complete();
                    }
                },
            );
            Self {
                base,
                inner,
                race: Mutex::new(Some(race)),
                timed_out_listeners: Mutex::new(Vec::new()),
            }
        })
    }

    pub fn add(&self, child: Arc<dyn Transient>) {
        self.inner.add(child);
    }

    pub fn timed_out(&self) -> bool {
        self.race
            .lock()
            .unwrap()
            .as_ref()
            .map(Race::timed_out)
            .unwrap_or(false)
    }

    pub fn on_timed_out(&self, listener: CompletionListener) {
        if self.timed_out() {
            listener();
            return;
        }
        self.timed_out_listeners.lock().unwrap().push(listener);
    }
}

impl Transient for TimedTrigger {
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

impl Generator for TimedTrigger {
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
        let delta = self
            .kernel()
            .map(|k| k.time_frame().delta())
            .unwrap_or(Duration::ZERO);
        if let Some(race) = self.race.lock().unwrap().as_ref() {
            race.advance(delta);
        }
        self.base.record_step();
    }
}

/// A `Future<T>` that also completes if `timeout` elapses before its
/// value is assigned. `take()` yields `None` on a timed-out read.
pub struct TimedFuture<T> {
    base: GeneratorBase,
    inner: Arc<crate::flow::future::Future<T>>,
    race: Mutex<Option<Race>>,
    timed_out_listeners: Mutex<Vec<CompletionListener>>,
}

impl<T: Send + Sync + 'static> TimedFuture<T> {
    pub fn new(timeout: Duration) -> Arc<Self> {
        Self::build(GeneratorBase::new(), timeout)
    }

    pub fn with_name(name: impl Into<String>, timeout: Duration) -> Arc<Self> {
        Self::build(GeneratorBase::with_name(name), timeout)
    }

    fn build(base: GeneratorBase, timeout: Duration) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<TimedFuture<T>>| {
            let inner = Arc::new(crate::flow::future::Future::new());
            let weak = weak.clone();
            let race = Race::new(
                timeout,
                vec![inner.clone() as Arc<dyn Transient>],
                move |timed_out| {
                    if let Some(this) = weak.upgrade() {
                        if timed_out {
                            // The slot is never assigned; `take()` keeps
                            // returning `None`.
                            this.inner.complete();
                            for listener in std::mem::take(&mut *this.timed_out_listeners.lock().unwrap()) {
                                listener();
                            }
                        }
                        this.complete();
                    }
                },
            );
            Self {
                base,
                inner,
                race: Mutex::new(Some(race)),
                timed_out_listeners: Mutex::new(Vec::new()),
            }
        })
    }

    pub fn set_value(&self, value: T) {
        self.inner.set_value(value);
    }

    pub fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    pub fn take(&self) -> Option<T> {
        self.inner.take()
    }

    pub fn timed_out(&self) -> bool {
        self.race
            .lock()
            .unwrap()
            .as_ref()
            .map(Race::timed_out)
            .unwrap_or(false)
    }

    pub fn on_timed_out(&self, listener: CompletionListener) {
        if self.timed_out() {
            listener();
            return;
        }
        self.timed_out_listeners.lock().unwrap().push(listener);
    }
}

impl<T: Send + Sync + 'static> Transient for TimedFuture<T> {
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

impl<T: Send + Sync + 'static> Generator for TimedFuture<T> {
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
        let delta = self
            .kernel()
            .map(|k| k.time_frame().delta())
            .unwrap_or(Duration::ZERO);
        if let Some(race) = self.race.lock().unwrap().as_ref() {
            race.advance(delta);
        }
        self.base.record_step();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::future::Future as FlowFuture;

    #[test]
    fn timed_barrier_completes_normally_when_members_finish_in_time() {
        let timed = TimedBarrier::new(Duration::from_secs(5));
        let f: Arc<FlowFuture<bool>> = Arc::new(FlowFuture::new());
        timed.add(f.clone());
        f.set_value(true);
        assert!(!timed.is_active());
        assert!(!timed.timed_out());
    }

    #[test]
    fn timed_barrier_times_out_when_members_never_finish() {
        let timed = TimedBarrier::new(Duration::from_millis(100));
        let f: Arc<FlowFuture<bool>> = Arc::new(FlowFuture::new());
        timed.add(f.clone());
        let fired = Arc::new(Mutex::new(false));
        let flag = fired.clone();
        timed.on_timed_out(Box::new(move || *flag.lock().unwrap() = true));

        for _ in 0..3 {
            timed.race.lock().unwrap().as_ref().unwrap().advance(Duration::from_millis(50));
        }

        assert!(!timed.is_active());
        assert!(timed.timed_out());
        assert!(*fired.lock().unwrap());
        assert!(!f.is_active(), "unmet work is abandoned: the wrapped barrier is force-completed");
    }

    #[test]
    fn timed_future_times_out_without_a_value() {
        let timed = TimedFuture::<u32>::new(Duration::from_millis(100));
        timed.race.lock().unwrap().as_ref().unwrap().advance(Duration::from_millis(150));
        assert!(!timed.is_active());
        assert!(timed.timed_out());
        assert_eq!(timed.take(), None);
    }

    #[test]
    fn on_timed_out_fires_immediately_if_already_timed_out() {
        let timed = TimedTrigger::new(Duration::from_millis(10));
        timed.race.lock().unwrap().as_ref().unwrap().advance(Duration::from_millis(20));
        assert!(timed.timed_out());

        let fired = Arc::new(Mutex::new(false));
        let flag = fired.clone();
        timed.on_timed_out(Box::new(move || *flag.lock().unwrap() = true));
        assert!(*fired.lock().unwrap());
    }
}
