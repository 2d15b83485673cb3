pub mod division;
pub mod schedule;
pub mod season;
pub mod standings;

pub use division::*;
pub use schedule::*;
pub use season::*;
pub use standings::*;
