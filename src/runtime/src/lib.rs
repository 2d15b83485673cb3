pub mod api;
pub mod automation;
pub mod live;
pub mod marketplace;
pub mod snapshot;
pub mod tournament;

pub use api::*;
pub use automation::*;
pub use live::*;
pub use marketplace::*;
pub use snapshot::*;
pub use tournament::*;
