// Ordered block sequence

use crate::core::{Block, Hash256};

/// Append-only sequence of blocks rooted at the genesis block.
///
/// The chain itself only enforces ownership and ordering; whether a block is
/// fit to append is decided by [`consensus`](crate::consensus) validation
/// before it gets here. Wholesale replacement happens only through the
/// fork-choice rule, never by mutating blocks in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// A fresh chain holding only the genesis block
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
        }
    }

    /// Rebuild a chain from an ordered block sequence (e.g. a fork
    /// candidate). Returns an error if the sequence does not start at
    /// genesis.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, String> {
        match blocks.first() {
            Some(first) if *first == Block::genesis() => Ok(Self { blocks }),
            Some(_) => Err("Chain does not start at the genesis block".to_string()),
            None => Err("Chain is empty".to_string()),
        }
    }

    /// Number of blocks, genesis included
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        // A chain always carries at least genesis
        false
    }

    /// The current tip
    pub fn head(&self) -> &Block {
        self.blocks.last().expect("chain always has genesis")
    }

    /// Identifier of the current tip
    pub fn head_hash(&self) -> Hash256 {
        self.head().block_hash
    }

    /// All blocks in order, genesis first
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Append an already-validated block
    pub fn append(&mut self, block: Block) {
        self.blocks.push(block);
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}
