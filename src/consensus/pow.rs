// Proof of Work engine

use crate::core::{Block, BlockBuilder, Hash256};
use std::time::Instant;
use tokio::sync::watch;

/// Nonces searched between cancellation checks
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Outcome of one mining attempt
#[derive(Debug)]
pub enum MiningOutcome {
    /// A valid nonce was found; the block is sealed and final
    Mined(Block),
    /// The chain head moved away from the candidate's parent mid-search.
    /// Not a failure: the caller rebuilds a candidate on the new head.
    Stale,
}

/// Proof-of-work miner with a fixed difficulty.
///
/// Difficulty counts required leading zero hex symbols of the rendered block
/// digest. There is no retargeting; the value is configuration.
#[derive(Debug, Clone, Copy)]
pub struct Miner {
    difficulty: u32,
}

impl Miner {
    pub fn new(difficulty: u32) -> Self {
        Self { difficulty }
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// The difficulty predicate shared by mining and validation
    pub fn meets_difficulty(&self, hash: &Hash256) -> bool {
        hash.leading_zero_digits() >= self.difficulty
    }

    /// Search increasing nonces from 0 until the candidate's digest meets
    /// the difficulty predicate, then seal it.
    ///
    /// `head` carries the current chain tip. The search checks it between
    /// nonce batches and abandons the candidate as [`MiningOutcome::Stale`]
    /// once the tip no longer matches the candidate's parent - a competing
    /// block won and continuing would mine a dead fork.
    pub fn mine(&self, candidate: BlockBuilder, head: &watch::Receiver<Hash256>) -> MiningOutcome {
        let start_time = Instant::now();
        let parent = candidate.previous_hash();

        for nonce in 0..=u64::MAX {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && *head.borrow() != parent {
                log::debug!("Abandoning stale candidate on parent {}", parent);
                return MiningOutcome::Stale;
            }

            let hash = candidate.hash_with_nonce(nonce);
            if self.meets_difficulty(&hash) {
                let elapsed = start_time.elapsed();
                log::info!(
                    "Found nonce {} after {:.2}s: {}",
                    nonce,
                    elapsed.as_secs_f64(),
                    hash
                );
                return MiningOutcome::Mined(candidate.seal(nonce));
            }

            // Progress indicator every 1M attempts
            if nonce > 0 && nonce % 1_000_000 == 0 {
                let elapsed = start_time.elapsed();
                log::debug!(
                    "Mining attempts: {} ({:.1} KH/s)",
                    nonce,
                    nonce as f64 / elapsed.as_secs_f64() / 1000.0
                );
            }
        }

        // Nonce space exhausted: rebuilding with a fresh timestamp gives a
        // new search space, so report the candidate as stale
        MiningOutcome::Stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;

    fn sample_candidate(parent: Hash256) -> BlockBuilder {
        let tx = Transaction::from_parts("alice".into(), "bob".into(), 30, 2, 1, 1000);
        BlockBuilder::new(parent, vec![tx], "miner".into())
    }

    #[test]
    fn test_meets_difficulty() {
        let miner = Miner::new(2);

        assert!(miner.meets_difficulty(&Hash256::zero()));
        assert!(!miner.meets_difficulty(&Hash256::new([0xff; 32])));

        let mut one_zero_byte = [0xffu8; 32];
        one_zero_byte[0] = 0x00;
        assert!(miner.meets_difficulty(&Hash256::new(one_zero_byte)));

        let mut one_zero_digit = [0xffu8; 32];
        one_zero_digit[0] = 0x0f;
        assert!(!miner.meets_difficulty(&Hash256::new(one_zero_digit)));
    }

    #[test]
    fn test_zero_difficulty_accepts_everything() {
        let miner = Miner::new(0);
        assert!(miner.meets_difficulty(&Hash256::new([0xff; 32])));
    }

    #[test]
    fn test_mine_at_low_difficulty() {
        let parent = Hash256::new([7; 32]);
        let miner = Miner::new(1);
        let (_head_tx, head) = watch::channel(parent);

        match miner.mine(sample_candidate(parent), &head) {
            MiningOutcome::Mined(block) => {
                assert!(block.verify_hash());
                assert!(miner.meets_difficulty(&block.block_hash));
                assert_eq!(block.previous_hash, parent);
            }
            MiningOutcome::Stale => panic!("search should not go stale"),
        }
    }

    #[test]
    fn test_mine_abandons_stale_parent() {
        let parent = Hash256::new([7; 32]);
        // Head already points somewhere else
        let (_head_tx, head) = watch::channel(Hash256::new([8; 32]));

        // Difficulty high enough that the search cannot win before the
        // first cancellation check
        let miner = Miner::new(64);
        match miner.mine(sample_candidate(parent), &head) {
            MiningOutcome::Stale => {}
            MiningOutcome::Mined(_) => panic!("stale candidate must be abandoned"),
        }
    }
}
