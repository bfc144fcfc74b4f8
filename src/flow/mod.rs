pub mod transient;
pub mod generator;
pub mod coroutine;
pub mod sequence;
pub mod barrier;
pub mod trigger;
pub mod timer;
pub mod timed;
pub mod future;
pub mod node;
pub mod group;

pub use transient::*;
pub use generator::*;
pub use coroutine::*;
pub use sequence::*;
pub use barrier::*;
pub use trigger::*;
pub use timer::*;
pub use timed::*;
pub use future::*;
pub use node::*;
pub use group::*;
