pub mod checkpoint;
pub mod state;

pub use checkpoint::*;
pub use state::*;
