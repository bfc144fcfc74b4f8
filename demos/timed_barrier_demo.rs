use flow_kernel::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let (kernel, factory) = AsyncKernel::new();

    println!("=== Timed Barrier Demo ===\n");

    // A barrier over three timers, with an overall deadline shorter than
    // the slowest of them, so the barrier itself times out.
    let timed = factory.timed_barrier(Duration::from_millis(400));
    timed.on_timed_out(Box::new(|| println!("  Deadline hit before every timer finished")));

    // Timers advance only while stepped, so each one is also held by a
    // `Node` that the root actually ticks; `timed.add` merely tracks its
    // completion for the barrier, which has no step behavior of its own.
    let pool = factory.node_named("TimerPool");
    let durations = [200u64, 300, 600];
    for (i, ms) in durations.iter().enumerate() {
        let timer = factory.timer_named(format!("Timer_{}", i), Duration::from_millis(*ms));
        let label = i;
        timer.on_completed(Box::new(move || println!("  Timer_{} elapsed", label)));
        pool.add_child(timer.clone());
        timed.add(timer as Arc<dyn Transient>);
    }

    // `pool` and `timed` are independent root children stepped every
    // tick; `timed` decides for itself (via its internal race) when it's
    // done, whichever way the race goes. `pool` has no completion rule of
    // its own, so it's wired to shut down alongside it.
    timed.on_completed(Box::new(|| println!("  Barrier settled")));
    complete_after(pool.clone() as Arc<dyn Transient>, timed.clone() as Arc<dyn Transient>);
    factory.make_root_bound(pool);
    factory.make_root_bound(timed.clone());

    println!("Starting timed barrier demo...");
    kernel.run_until_complete().await?;
    println!(
        "Finished: {}",
        if timed.timed_out() {
            "the deadline won the race"
        } else {
            "every timer finished in time"
        }
    );

    Ok(())
}
