use flow_kernel::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let (kernel, factory) = AsyncKernel::new();

    let counter = Arc::new(AtomicU32::new(0));

    let heartbeat = factory
        .periodic_named("HeartbeatTimer", Duration::from_millis(500));
    let counter_clone = counter.clone();
    heartbeat.on_tick(move |n| {
        counter_clone.store(n as u32, Ordering::Relaxed);
        println!("Heartbeat #{}", n);
    });
    factory.make_root_bound(heartbeat);

    let completion: Arc<Future<bool>> = factory.future_named("CompletionSignal");
    completion.on_completed(Box::new(|| println!("Completion signal fired! Stopping...")));
    factory.make_root_bound(completion.clone());

    println!("Starting basic example...");
    loop {
        kernel.update(Duration::from_millis(100));
        if counter.load(Ordering::Relaxed) >= 5 {
            completion.set_value(true);
        }
        if kernel.root().child_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    println!("Example completed!");

    Ok(())
}
