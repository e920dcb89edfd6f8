// Block and chain validation, plus the fork-choice rule

use crate::chain::Chain;
use crate::consensus::Miner;
use crate::core::{Block, Hash256};
use crate::ledger::{Ledger, LedgerError};
use std::fmt;

/// Why a block or chain was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Stored Merkle root does not match the recomputed one
    InvalidMerkleRoot,
    /// Stored block hash does not match the recomputed digest
    InvalidBlockHash,
    /// Block hash does not satisfy the difficulty predicate
    InvalidProofOfWork,
    /// A transaction's stored ID does not match its recomputed digest
    InvalidTransactionId,
    /// previous_hash does not point at the expected parent
    BrokenLinkage,
    /// Chain does not start at the genesis block
    MissingGenesis,
    /// A transaction batch failed balance validation
    LedgerRejected(LedgerError),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationError::InvalidMerkleRoot => write!(f, "Invalid merkle root"),
            ValidationError::InvalidBlockHash => write!(f, "Invalid block hash"),
            ValidationError::InvalidProofOfWork => write!(f, "Invalid proof of work"),
            ValidationError::InvalidTransactionId => write!(f, "Invalid transaction id"),
            ValidationError::BrokenLinkage => write!(f, "Broken previous-block linkage"),
            ValidationError::MissingGenesis => write!(f, "Chain does not start at genesis"),
            ValidationError::LedgerRejected(e) => write!(f, "Ledger rejected block: {}", e),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<LedgerError> for ValidationError {
    fn from(err: LedgerError) -> Self {
        ValidationError::LedgerRejected(err)
    }
}

/// Fork-choice verdict
#[derive(Debug)]
pub enum ForkDecision {
    /// Candidate was shorter, equal length, or invalid
    KeepCurrent,
    /// Candidate wins; carries the ledger implied by replaying it
    Adopt(Ledger),
}

/// Validates blocks and chains against the active difficulty.
///
/// Any single failed check rejects the block outright; there is no partial
/// acceptance.
pub struct BlockValidator {
    miner: Miner,
}

impl BlockValidator {
    pub fn new(difficulty: u32) -> Self {
        Self {
            miner: Miner::new(difficulty),
        }
    }

    /// Structural validation of a single non-genesis block:
    /// Merkle root, transaction IDs, block hash, difficulty, and linkage to
    /// the expected parent. Balance validation happens at the call site
    /// against the ledger state implied by the preceding blocks.
    pub fn validate_block(
        &self,
        block: &Block,
        expected_parent: &Hash256,
    ) -> Result<(), ValidationError> {
        if block.compute_merkle_root() != block.merkle_root {
            return Err(ValidationError::InvalidMerkleRoot);
        }

        for tx in &block.transactions {
            if !tx.verify_hash() {
                return Err(ValidationError::InvalidTransactionId);
            }
        }

        if !block.verify_hash() {
            return Err(ValidationError::InvalidBlockHash);
        }

        if !self.miner.meets_difficulty(&block.block_hash) {
            return Err(ValidationError::InvalidProofOfWork);
        }

        if block.previous_hash != *expected_parent {
            return Err(ValidationError::BrokenLinkage);
        }

        Ok(())
    }

    /// Validate a whole chain block by block from genesis, replaying every
    /// transaction batch. Returns the ledger state implied by the chain,
    /// which fork adoption swaps in wholesale.
    pub fn validate_chain(
        &self,
        chain: &Chain,
        opening_balance: u64,
    ) -> Result<Ledger, ValidationError> {
        let blocks = chain.blocks();

        // Genesis is a fixed constant and exempt from the difficulty
        // predicate
        if blocks.first() != Some(&Block::genesis()) {
            return Err(ValidationError::MissingGenesis);
        }

        let mut ledger = Ledger::new(opening_balance);
        for window in blocks.windows(2) {
            let (parent, block) = (&window[0], &window[1]);
            self.validate_block(block, &parent.block_hash)?;
            ledger.apply_batch(&block.transactions, &block.miner)?;
        }

        Ok(ledger)
    }

    /// Longest-chain fork choice.
    ///
    /// A candidate replaces the current chain only if it is strictly longer
    /// and passes full validation from genesis; ties keep the current chain,
    /// and an invalid candidate is never adopted regardless of length.
    pub fn resolve_fork(
        &self,
        current: &Chain,
        candidate: &Chain,
        opening_balance: u64,
    ) -> ForkDecision {
        if candidate.len() <= current.len() {
            return ForkDecision::KeepCurrent;
        }

        match self.validate_chain(candidate, opening_balance) {
            Ok(ledger) => ForkDecision::Adopt(ledger),
            Err(e) => {
                log::warn!("Rejecting longer but invalid fork candidate: {}", e);
                ForkDecision::KeepCurrent
            }
        }
    }
}
