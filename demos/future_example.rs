use flow_kernel::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let (kernel, factory) = AsyncKernel::new();

    let data_future: Arc<Future<String>> = factory.future_named("DataFuture");
    let count_future: Arc<Future<u32>> = factory.future_named("CountFuture");

    let data_producer = {
        let data_future = data_future.clone();
        factory.coroutine_named("DataProducer", move || {
            println!("Producing data...");
            let mut steps = vec![StepOutcome::Yield, StepOutcome::Yield];
            data_future.set_value("Hello from the kernel!".to_string());
            println!("Data produced");
            steps.push(StepOutcome::Done(()));
            Box::new(steps.into_iter()) as LazySeq<()>
        })
    };

    let count_producer = {
        let count_future = count_future.clone();
        factory.coroutine_named("CountProducer", move || {
            println!("Counting...");
            let mut steps: Vec<StepOutcome<()>> =
                (1..=5).map(|i| {
                    println!("Count: {}", i);
                    StepOutcome::Yield
                }).collect();
            count_future.set_value(42);
            println!("Counting complete");
            steps.push(StepOutcome::Done(()));
            Box::new(steps.into_iter()) as LazySeq<()>
        })
    };

    let data_for_consumer = data_future.clone();
    let count_for_consumer = count_future.clone();
    let consumer = factory.coroutine_named("Consumer", move || {
        println!("Waiting for futures...");
        Box::new(
            vec![
                StepOutcome::Await(data_for_consumer.clone() as Arc<dyn Transient>),
                StepOutcome::Await(count_for_consumer.clone() as Arc<dyn Transient>),
            ]
            .into_iter()
            .chain(std::iter::once_with(move || {
                println!("Received data: {}", data_for_consumer.get());
                println!("Received count: {}", count_for_consumer.get());
                println!("All data received!");
                StepOutcome::Done(())
            })),
        ) as LazySeq<()>
    });

    let producer_barrier = factory.barrier_named("ProducerBarrier");
    producer_barrier.add(data_producer.clone());
    producer_barrier.add(count_producer.clone());

    let sequence = factory.sequence_named("FutureSequence");
    sequence.add_child(data_producer);
    sequence.add_child(count_producer);
    sequence.add_child(producer_barrier);
    sequence.add_child(consumer);
    factory.make_root_bound(sequence);

    println!("Starting future example...");
    kernel.run_until_complete().await?;
    println!("Example completed!");

    Ok(())
}
