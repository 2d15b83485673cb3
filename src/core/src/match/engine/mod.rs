pub mod actions;
pub mod events;
pub mod input;
pub mod sim;
pub mod stats;

pub use events::*;
pub use input::*;
pub use sim::*;
pub use stats::*;
