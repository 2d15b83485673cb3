pub mod contract;
pub mod player;
pub mod staff;
pub mod team;

pub use contract::*;
pub use player::*;
pub use staff::*;
pub use team::*;
