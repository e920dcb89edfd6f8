// Block data structures

use crate::core::{merkle_root, now_millis, sha256, Address, Hash256, Transaction};
use serde::{Deserialize, Serialize};

/// Timestamp of the genesis block. Fixed so every node derives the exact
/// same genesis and chains share a common root.
const GENESIS_TIMESTAMP: u64 = 0;

/// A finalized block. Constructed only through [`BlockBuilder::seal`] (or as
/// the genesis constant) and never mutated afterwards: the nonce is frozen
/// and `block_hash` is final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Identifier of the parent block; zero sentinel for genesis
    pub previous_hash: Hash256,
    /// Merkle root over the contained transaction IDs, in inclusion order
    pub merkle_root: Hash256,
    /// Creation time, milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Proof-of-work nonce found by the miner
    pub nonce: u64,
    /// Beneficiary credited with the contained transactions' fees
    pub miner: Address,
    /// Block identifier: digest over (previous_hash, merkle_root, timestamp, nonce)
    pub block_hash: Hash256,
    /// Transactions in inclusion order
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// The deterministic genesis block shared by all nodes
    pub fn genesis() -> Self {
        let mut block = Self {
            previous_hash: Hash256::zero(),
            merkle_root: merkle_root(&[]),
            timestamp: GENESIS_TIMESTAMP,
            nonce: 0,
            miner: Address::new(),
            block_hash: Hash256::zero(),
            transactions: Vec::new(),
        };
        block.block_hash = block.compute_hash();
        block
    }

    /// Recompute the block identifier from the header fields.
    ///
    /// The miner identifier is deliberately not part of the preimage; the
    /// transactions are committed through the Merkle root.
    pub fn compute_hash(&self) -> Hash256 {
        hash_header(
            &self.previous_hash,
            &self.merkle_root,
            self.timestamp,
            self.nonce,
        )
    }

    /// Check that the stored identifier matches the recomputed one
    pub fn verify_hash(&self) -> bool {
        self.block_hash == self.compute_hash()
    }

    /// Recompute the Merkle root from the contained transactions
    pub fn compute_merkle_root(&self) -> Hash256 {
        let ids: Vec<Hash256> = self.transactions.iter().map(|tx| tx.tx_hash).collect();
        merkle_root(&ids)
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.previous_hash == Hash256::zero()
    }
}

/// A block candidate under construction. The only state the proof-of-work
/// search is allowed to vary is the nonce it probes; everything else is
/// fixed at build time. [`seal`](Self::seal) freezes the winning nonce into
/// an immutable [`Block`].
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    previous_hash: Hash256,
    merkle_root: Hash256,
    timestamp: u64,
    miner: Address,
    transactions: Vec<Transaction>,
}

impl BlockBuilder {
    /// Start a candidate on the given parent with the given transaction batch
    pub fn new(previous_hash: Hash256, transactions: Vec<Transaction>, miner: Address) -> Self {
        let ids: Vec<Hash256> = transactions.iter().map(|tx| tx.tx_hash).collect();
        Self {
            previous_hash,
            merkle_root: merkle_root(&ids),
            timestamp: now_millis(),
            miner,
            transactions,
        }
    }

    /// Parent this candidate extends
    pub fn previous_hash(&self) -> Hash256 {
        self.previous_hash
    }

    /// Candidate hash for a probed nonce
    pub fn hash_with_nonce(&self, nonce: u64) -> Hash256 {
        hash_header(&self.previous_hash, &self.merkle_root, self.timestamp, nonce)
    }

    /// Freeze the candidate into a finalized block with the given nonce
    pub fn seal(self, nonce: u64) -> Block {
        let block_hash = self.hash_with_nonce(nonce);
        Block {
            previous_hash: self.previous_hash,
            merkle_root: self.merkle_root,
            timestamp: self.timestamp,
            nonce,
            miner: self.miner,
            block_hash,
            transactions: self.transactions,
        }
    }
}

fn hash_header(previous_hash: &Hash256, merkle_root: &Hash256, timestamp: u64, nonce: u64) -> Hash256 {
    let mut data = Vec::with_capacity(80);
    data.extend_from_slice(previous_hash.as_bytes());
    data.extend_from_slice(merkle_root.as_bytes());
    data.extend_from_slice(&timestamp.to_le_bytes());
    data.extend_from_slice(&nonce.to_le_bytes());
    sha256(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_txs() -> Vec<Transaction> {
        vec![
            Transaction::from_parts("alice".into(), "bob".into(), 30, 2, 1, 1000),
            Transaction::from_parts("bob".into(), "carol".into(), 10, 1, 2, 1001),
        ]
    }

    #[test]
    fn test_genesis_is_deterministic() {
        let a = Block::genesis();
        let b = Block::genesis();
        assert_eq!(a, b);
        assert!(a.is_genesis());
        assert!(a.verify_hash());
        assert_eq!(a.merkle_root, Hash256::zero());
    }

    #[test]
    fn test_sealed_block_hash_is_recomputable() {
        let builder = BlockBuilder::new(Block::genesis().block_hash, sample_txs(), "miner".into());
        let block = builder.seal(42);

        assert!(block.verify_hash());
        assert_eq!(block.nonce, 42);
        assert_eq!(block.compute_merkle_root(), block.merkle_root);
    }

    #[test]
    fn test_builder_hash_matches_sealed_hash() {
        let builder = BlockBuilder::new(Hash256::zero(), sample_txs(), "miner".into());
        let probed = builder.hash_with_nonce(7);
        let block = builder.seal(7);
        assert_eq!(block.block_hash, probed);
    }

    #[test]
    fn test_nonce_changes_hash() {
        let builder = BlockBuilder::new(Hash256::zero(), sample_txs(), "miner".into());
        assert_ne!(builder.hash_with_nonce(0), builder.hash_with_nonce(1));
    }

    #[test]
    fn test_tampered_block_fails_verification() {
        let builder = BlockBuilder::new(Hash256::zero(), sample_txs(), "miner".into());
        let block = builder.seal(5);

        let mut tampered = block.clone();
        tampered.timestamp += 1;
        assert!(!tampered.verify_hash());

        let mut tampered = block.clone();
        tampered.nonce += 1;
        assert!(!tampered.verify_hash());

        // Payload tampering leaves the header intact but breaks the
        // transaction's own identifier
        let mut tampered = block;
        tampered.transactions[0].amount = 9999;
        assert!(tampered.verify_hash());
        assert!(!tampered.transactions[0].verify_hash());
    }

    #[test]
    fn test_wire_shape() {
        let builder = BlockBuilder::new(Block::genesis().block_hash, sample_txs(), "miner".into());
        let block = builder.seal(3);

        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["previous_hash"], block.previous_hash.to_hex());
        assert_eq!(json["merkle_root"], block.merkle_root.to_hex());
        assert_eq!(json["block_hash"], block.block_hash.to_hex());
        assert_eq!(json["transactions"].as_array().unwrap().len(), 2);

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }
}
