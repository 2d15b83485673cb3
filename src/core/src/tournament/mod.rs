pub mod bracket;
pub mod strength;
pub mod tournament;

pub use bracket::*;
pub use strength::*;
pub use tournament::*;
