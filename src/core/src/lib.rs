pub mod calendar;
pub mod club;
pub mod commentary;
pub mod config;
pub mod error;
pub mod events;
pub mod league;
pub mod marketplace;
pub mod r#match;
pub mod tournament;

pub use calendar::*;
pub use club::*;
pub use config::*;
pub use error::*;
pub use league::*;
