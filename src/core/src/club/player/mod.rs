pub mod aging;
pub mod attributes;
pub mod player;
pub mod progression;
pub mod valuation;

pub use aging::*;
pub use attributes::*;
pub use player::*;
pub use progression::*;
pub use valuation::*;
