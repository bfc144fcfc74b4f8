use flow_kernel::*;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct GameState {
    game_over: AtomicBool,
    turn_count: AtomicU32,
}

impl GameState {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            game_over: AtomicBool::new(false),
            turn_count: AtomicU32::new(0),
        })
    }

    fn is_game_over(&self) -> bool {
        self.game_over.load(Ordering::Relaxed)
    }

    fn next_turn(&self) -> u32 {
        let turn = self.turn_count.fetch_add(1, Ordering::Relaxed) + 1;
        println!("Starting turn {}", turn);
        if turn >= 3 {
            self.game_over.store(true, Ordering::Relaxed);
            println!("Game ended after {} turns", turn);
        }
        turn
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let (kernel, factory) = AsyncKernel::new();
    let game_state = GameState::new();

    let start_game = factory.subroutine(|| {
        println!("Initializing game...");
        println!("Players drawing initial cards...");
        println!("Players ready for game start");
    });

    // One coroutine per turn, driven by a trigger each time it's played.
    // The turn counter's own deadline decides when the loop ends.
    let turns = factory.coroutine_named("TurnLoop", {
        let game_state = game_state.clone();
        move || {
            Box::new(std::iter::from_fn(move || {
                if game_state.is_game_over() {
                    return None;
                }
                println!("Processing player turn...");
                game_state.next_turn();
                Some(StepOutcome::Yield)
            })) as LazySeq<()>
        }
    });

    let end_game = factory.subroutine(|| {
        println!("Cleaning up game state...");
        println!("Game cleanup complete");
    });

    let game_sequence = factory.sequence_named("GameLoop");
    game_sequence.add_child(start_game);
    game_sequence.add_child(turns);
    game_sequence.add_child(end_game);
    factory.make_root_bound(game_sequence);

    println!("Starting game loop example...");
    kernel.run_for(Duration::from_secs(5)).await?;
    println!("Example completed!");

    Ok(())
}
