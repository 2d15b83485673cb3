pub mod engine;
pub mod game;
pub mod live;

pub use engine::*;
pub use game::*;
pub use live::*;
