// Peer-to-peer networking

mod message;
mod node;
pub mod peer;

pub use message::*;
pub use node::*;
