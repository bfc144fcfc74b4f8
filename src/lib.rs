pub mod config;
pub mod error;
pub mod kernel;
pub mod flow;
pub mod factory;
pub mod time_frame;
pub mod logger;

pub use config::*;
pub use error::*;
pub use kernel::*;
pub use flow::*;
pub use factory::*;
pub use time_frame::*;
pub use logger::*;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;