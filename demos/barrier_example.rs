use flow_kernel::*;
use std::time::Duration;

async fn async_task(name: &'static str, delay_ms: u64) -> Result<()> {
    println!("Task {} starting...", name);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    println!("Task {} completed after {}ms", name, delay_ms);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let (kernel, factory) = AsyncKernel::new();

    let barrier = factory.barrier_named("TaskBarrier");
    let task1 = factory.async_coroutine_named("Task1", async_task("Alpha", 300));
    let task2 = factory.async_coroutine_named("Task2", async_task("Beta", 500));
    let task3 = factory.async_coroutine_named("Task3", async_task("Gamma", 200));
    barrier.add(task1.clone());
    barrier.add(task2.clone());
    barrier.add(task3.clone());

    let after_barrier = factory.async_coroutine_named("AfterBarrier", async {
        println!("All barrier tasks completed! Proceeding...");
        tokio::time::sleep(Duration::from_millis(100)).await;
        println!("Cleanup done");
        Ok(())
    });

    let sequence = factory.sequence_named("BarrierSequence");
    sequence.add_child(task1);
    sequence.add_child(task2);
    sequence.add_child(task3);
    sequence.add_child(barrier);
    sequence.add_child(after_barrier);
    factory.make_root_bound(sequence);

    println!("Starting barrier example...");
    kernel.run_until_complete().await?;
    println!("Example completed!");

    Ok(())
}
