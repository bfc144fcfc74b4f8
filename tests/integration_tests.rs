use flow_kernel::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn barrier_of_three_futures_completes_only_once_every_future_is_set() {
    let (kernel, factory) = AsyncKernel::new();
    let f1: Arc<Future<bool>> = factory.future();
    let f2: Arc<Future<bool>> = factory.future();
    let f3: Arc<Future<bool>> = factory.future();

    let barrier = factory.barrier();
    barrier.add(f1.clone());
    barrier.add(f2.clone());
    barrier.add(f3.clone());
    factory.make_root_bound(barrier.clone());

    let completions = Arc::new(AtomicU32::new(0));
    let c = completions.clone();
    barrier.on_completed(Box::new(move || {
        c.fetch_add(1, Ordering::Relaxed);
    }));

    kernel.update(Duration::from_millis(16));
    assert!(barrier.is_active());

    f2.set_value(true);
    kernel.update(Duration::from_millis(16));
    assert!(barrier.is_active());

    f1.set_value(true);
    kernel.update(Duration::from_millis(16));
    assert!(barrier.is_active());

    f3.set_value(true);
    kernel.update(Duration::from_millis(16));
    assert!(!barrier.is_active());
    assert_eq!(completions.load(Ordering::Relaxed), 1);
}

#[test]
fn trigger_of_three_futures_completes_on_the_first_and_leaves_the_rest() {
    let (_kernel, factory) = AsyncKernel::new();
    let f1: Arc<Future<bool>> = factory.future();
    let f2: Arc<Future<bool>> = factory.future();
    let f3: Arc<Future<bool>> = factory.future();

    let trigger = factory.trigger();
    trigger.add(f1.clone());
    trigger.add(f2.clone());
    trigger.add(f3.clone());

    f2.set_value(true);

    assert!(!trigger.is_active());
    assert!(Transient::is_active(f1.as_ref()));
    assert!(Transient::is_active(f3.as_ref()));
}

#[test]
fn deep_nested_sequence_drains_children_in_order() {
    let (kernel, factory) = AsyncKernel::new();
    let log = Arc::new(Mutex::new(Vec::<u32>::new()));

    let record = |log: Arc<Mutex<Vec<u32>>>, n: u32| {
        factory.subroutine(move || {
            log.lock().unwrap().push(n);
        })
    };

    let inner = factory.sequence_named("Inner");
    inner.add_child(record(log.clone(), 2));
    inner.add_child(record(log.clone(), 3));
    inner.add_child(record(log.clone(), 4));

    let outer = factory.sequence_named("Outer");
    outer.add_child(record(log.clone(), 1));
    outer.add_child(inner);
    outer.add_child(record(log.clone(), 5));
    outer.add_child(record(log.clone(), 6));
    factory.make_root_bound(outer);

    for _ in 0..20 {
        if kernel.root().child_count() == 0 {
            break;
        }
        kernel.update(Duration::from_millis(16));
    }

    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn periodic_timer_ticks_at_least_three_times_over_ten_tenth_second_updates() {
    let (kernel, factory) = AsyncKernel::new();
    let periodic = factory.periodic(Duration::from_millis(100));
    let ticks = Arc::new(AtomicU32::new(0));
    let t = ticks.clone();
    periodic.on_tick(move |_| {
        t.fetch_add(1, Ordering::Relaxed);
    });
    factory.make_root_bound(periodic.clone());

    for _ in 0..10 {
        kernel.update(Duration::from_millis(100));
    }

    assert!(ticks.load(Ordering::Relaxed) >= 3);
    assert!(periodic.is_active());
}

#[test]
fn timed_future_times_out_and_leaves_the_value_slot_at_default() {
    let (kernel, factory) = AsyncKernel::new();
    let timed: Arc<TimedFuture<String>> = factory.timed_future(Duration::from_millis(50));
    let timed_out = Arc::new(Mutex::new(false));
    let flag = timed_out.clone();
    timed.on_timed_out(Box::new(move || *flag.lock().unwrap() = true));
    factory.make_root_bound(timed.clone());

    for _ in 0..10 {
        kernel.update(Duration::from_millis(10));
    }

    assert!(*timed_out.lock().unwrap());
    assert!(!timed.is_active());
    assert_eq!(timed.take(), None);
}

#[test]
fn coroutine_yielding_a_future_suspends_until_it_resolves() {
    let (kernel, factory) = AsyncKernel::new();
    let awaited: Arc<Future<i32>> = factory.future();
    let waited_for: Arc<dyn Transient> = awaited.clone();

    let coroutine = factory.coroutine_named("AwaitsFuture", move || {
        Box::new(
            vec![StepOutcome::Await(waited_for), StepOutcome::Done(99)].into_iter(),
        ) as LazySeq<i32>
    });
    factory.make_root_bound(coroutine.clone());

    kernel.update(Duration::from_millis(16));
    assert!(coroutine.is_active());
    assert!(!coroutine.is_running());
    let step_number = coroutine.step_number();

    kernel.update(Duration::from_millis(16));
    assert_eq!(coroutine.step_number(), step_number, "suspended step is a no-op");

    awaited.set_value(7);
    kernel.update(Duration::from_millis(16));
    assert!(!coroutine.is_active());
    assert_eq!(coroutine.value(), Some(99));
}

#[test]
fn kernel_time_never_decreases_across_updates() {
    let (kernel, _factory) = AsyncKernel::new();
    let mut last = Duration::ZERO;
    for ms in [16u64, 33, 16, 50, 0, 100] {
        kernel.update(Duration::from_millis(ms));
        let now = kernel.time_frame().total();
        assert!(now >= last);
        last = now;
    }
}

#[test]
fn break_flow_stops_stepping_until_cleared() {
    let (kernel, factory) = AsyncKernel::new();
    let future: Arc<Future<bool>> = factory.future();
    factory.make_root_bound(future.clone());
    future.set_value(true);

    kernel.break_flow();
    kernel.update(Duration::from_millis(16));
    assert_eq!(kernel.root().child_count(), 1, "stepping was skipped");

    kernel.clear_break();
    kernel.update(Duration::from_millis(16));
    assert_eq!(kernel.root().child_count(), 0);
}

#[test]
fn group_bundles_lifetimes_without_forcing_member_completion() {
    let (_kernel, factory) = AsyncKernel::new();
    let group = factory.group();
    let member: Arc<Future<bool>> = factory.future();
    group.add(member.clone());

    group.complete();
    assert!(!group.is_active());
    assert!(Transient::is_active(member.as_ref()));
}
