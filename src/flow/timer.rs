use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use uuid::Uuid;

use crate::flow::generator::{Generator, GeneratorBase};
use crate::flow::transient::{CompletionListener, Transient};
use crate::kernel::AsyncKernel;
use crate::logger::Logger;

/// Kernel-time driven, one-shot: accumulates the `delta` of every step
/// it is given until it reaches `duration`, then completes. Unlike a
/// wall-clock `Instant`, elapsed time is entirely a function of the
/// deltas it is stepped with. A kernel frozen mid-tick freezes every
/// timer with it.
pub struct Timer {
    base: GeneratorBase,
    duration: Duration,
    elapsed: Mutex<Duration>,
}

impl Timer {
    pub fn new(duration: Duration) -> Self {
        Self {
            base: GeneratorBase::new(),
            duration,
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn with_name(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            base: GeneratorBase::with_name(name),
            duration,
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap()
    }

    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.elapsed())
    }

    /// Advances the timer by `delta`, completing it if `duration` has
    /// been reached. Called by the kernel (or a hand-driven test) each
    /// tick, since `Generator::step` carries no delta of its own.
    pub fn advance(&self, delta: Duration) {
        if !self.base.should_step() {
            return;
        }
        let mut elapsed = self.elapsed.lock().unwrap();
        *elapsed += delta;
        let done = *elapsed >= self.duration;
        drop(elapsed);
        self.base.record_step();
        if done {
            self.complete();
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl Transient for Timer {
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

impl Generator for Timer {
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

    /// Advances by the owning kernel's current delta, falling back to a
    /// no-op when stepped outside of one (e.g. a freestanding test).
    fn step(&self) {
        let delta = self
            .kernel()
            .map(|k| k.time_frame().delta())
            .unwrap_or(Duration::ZERO);
        self.advance(delta);
    }
}

/// A `Timer` that re-arms itself on elapsing instead of completing,
/// firing a permanent tick callback every `interval`. Never completes on
/// its own.
///
/// By default, fires at most once per `advance` call: a single large
/// delta spanning multiple intervals (a stalled kernel catching up)
/// still only fires once, with the remaining elapsed time carried over
/// and checked again on the next call. Opt into firing once per interval
/// crossed within a single call with `set_catch_up(true)`.
pub struct Periodic {
    base: GeneratorBase,
    interval: Duration,
    elapsed: Mutex<Duration>,
    tick_count: Mutex<u64>,
    on_tick: Mutex<Vec<Box<dyn Fn(u64) + Send + Sync>>>,
    catch_up: AtomicBool,
}

impl Periodic {
    pub fn new(interval: Duration) -> Self {
        Self {
            base: GeneratorBase::new(),
            interval,
            elapsed: Mutex::new(Duration::ZERO),
            tick_count: Mutex::new(0),
            on_tick: Mutex::new(Vec::new()),
            catch_up: AtomicBool::new(false),
        }
    }

    pub fn with_name(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            base: GeneratorBase::with_name(name),
            interval,
            elapsed: Mutex::new(Duration::ZERO),
            tick_count: Mutex::new(0),
            on_tick: Mutex::new(Vec::new()),
            catch_up: AtomicBool::new(false),
        }
    }

    pub fn on_tick<F>(&self, callback: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.on_tick.lock().unwrap().push(Box::new(callback));
    }

    pub fn tick_count(&self) -> u64 {
        *self.tick_count.lock().unwrap()
    }

    /// Enables or disables firing once per whole interval crossed within
    /// a single `advance` call. Off by default.
    pub fn set_catch_up(&self, enabled: bool) {
        self.catch_up.store(enabled, Ordering::Relaxed);
    }

    pub fn catch_up(&self) -> bool {
        self.catch_up.load(Ordering::Relaxed)
    }

    /// Accumulates `delta` and fires once the whole `interval` has been
    /// crossed. With `catch_up` disabled (the default), at most one tick
    /// fires per call, no matter how much of `interval` the accumulated
    /// `elapsed` has crossed; any remainder beyond one interval is kept
    /// and checked again on the next call, so no time is lost, but
    /// callers relying on a fixed cadence never see more than one tick
    /// per `advance`. With `catch_up` enabled, fires once per interval
    /// crossed within this single call.
    pub fn advance(&self, delta: Duration) {
        if !self.base.should_step() {
            return;
        }
        let mut elapsed = self.elapsed.lock().unwrap();
        *elapsed += delta;
        let catch_up = self.catch_up();
        let mut fired = Vec::new();
        loop {
            if *elapsed < self.interval {
                break;
            }
            *elapsed -= self.interval;
            let mut count = self.tick_count.lock().unwrap();
            *count += 1;
            fired.push(*count);
            if !catch_up {
                break;
            }
        }
        drop(elapsed);
        self.base.record_step();
        if !fired.is_empty() {
            let callbacks = self.on_tick.lock().unwrap();
            for n in fired {
                for callback in callbacks.iter() {
                    callback(n);
                }
            }
        }
    }
}

impl Default for Periodic {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl Transient for Periodic {
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

impl Generator for Periodic {
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
        let delta = self
            .kernel()
            .map(|k| k.time_frame().delta())
            .unwrap_or(Duration::ZERO);
        self.advance(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_once_duration_is_reached() {
        let timer = Timer::new(Duration::from_millis(250));
        for _ in 0..2 {
            timer.advance(Duration::from_millis(100));
        }
        assert!(timer.is_active());
        timer.advance(Duration::from_millis(100));
        assert!(!timer.is_active());
    }

    #[test]
    fn periodic_fires_at_least_three_times_over_ten_ticks_of_a_tenth_second() {
        let periodic = Periodic::new(Duration::from_millis(300));
        let fires = Arc::new(Mutex::new(0u64));
        let f = fires.clone();
        periodic.on_tick(move |_| *f.lock().unwrap() += 1);

        for _ in 0..10 {
            periodic.advance(Duration::from_millis(100));
        }

        assert!(*fires.lock().unwrap() >= 3);
        assert!(periodic.is_active());
    }

    #[test]
    fn a_single_large_delta_fires_only_once_by_default() {
        let periodic = Periodic::new(Duration::from_millis(100));
        periodic.advance(Duration::from_millis(350));
        assert_eq!(periodic.tick_count(), 1);
    }

    #[test]
    fn the_remainder_of_an_uncoalesced_delta_is_kept_for_the_next_advance() {
        let periodic = Periodic::new(Duration::from_millis(100));
        periodic.advance(Duration::from_millis(350));
        assert_eq!(periodic.tick_count(), 1);
        periodic.advance(Duration::ZERO);
        assert_eq!(periodic.tick_count(), 2);
    }

    #[test]
    fn catch_up_fires_once_per_interval_crossed_in_a_single_advance() {
        let periodic = Periodic::new(Duration::from_millis(100));
        periodic.set_catch_up(true);
        periodic.advance(Duration::from_millis(350));
        assert_eq!(periodic.tick_count(), 3);
    }
}
