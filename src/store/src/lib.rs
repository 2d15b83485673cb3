pub mod generators;
pub mod ledger;
pub mod locks;
pub mod store;
pub mod tx;
pub mod world;

pub use generators::*;
pub use ledger::*;
pub use locks::*;
pub use store::*;
pub use tx::*;
pub use world::*;
