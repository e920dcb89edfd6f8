// Minimal proof-of-work blockchain node

pub mod chain;
pub mod cli;
pub mod consensus;
pub mod core;
pub mod ledger;
pub mod mempool;
pub mod network;

// Re-exports for convenience
pub use chain::Chain;
pub use consensus::{BlockValidator, ForkDecision, Miner, MiningOutcome, ValidationError};
pub use core::{Block, BlockBuilder, Hash256, Transaction};
pub use ledger::{Ledger, LedgerError};
pub use mempool::Mempool;
pub use network::{Message, Node, NodeConfig};
