// Core chain data structures

mod block;
mod hash;
mod merkle;
mod transaction;
mod types;

pub use block::*;
pub use hash::*;
pub use merkle::*;
pub use transaction::*;
pub use types::*;
