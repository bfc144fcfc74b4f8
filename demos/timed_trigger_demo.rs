use flow_kernel::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let (kernel, factory) = AsyncKernel::new();

    println!("=== Timed Trigger Demo ===\n");

    // A trigger over two candidate events, raced against a deadline.
    // Whichever settles first wins; the loser keeps living independently.
    let timed = factory.timed_trigger(Duration::from_millis(300));
    timed.on_timed_out(Box::new(|| println!("  Neither candidate fired before the deadline")));
    timed.on_completed(Box::new(|| println!("  Trigger settled")));

    let fast: Arc<Future<&'static str>> = factory.future_named("FastCandidate");
    let slow: Arc<Future<&'static str>> = factory.future_named("SlowCandidate");
    timed.add(fast.clone() as Arc<dyn Transient>);
    timed.add(slow.clone() as Arc<dyn Transient>);

    let pool = factory.node_named("CandidatePool");

    let fast_setter = factory.timer_named("FastTimer", Duration::from_millis(100));
    fast_setter.on_completed(Box::new(move || fast.set_value("fast candidate")));
    pool.add_child(fast_setter);

    let slow_setter = factory.timer_named("SlowTimer", Duration::from_millis(250));
    slow_setter.on_completed(Box::new(move || slow.set_value("slow candidate")));
    pool.add_child(slow_setter);

    complete_after(pool.clone() as Arc<dyn Transient>, timed.clone() as Arc<dyn Transient>);
    factory.make_root_bound(pool);
    factory.make_root_bound(timed.clone());

    println!("Starting timed trigger demo...");
    kernel.run_until_complete().await?;
    println!(
        "Finished: {}",
        if timed.timed_out() {
            "the deadline won the race"
        } else {
            "a candidate fired in time"
        }
    );

    Ok(())
}
