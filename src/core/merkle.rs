// Merkle commitment over transaction IDs

use crate::core::{sha256, Hash256};

/// Fold an ordered sequence of transaction IDs into a single root digest.
///
/// Leaves are paired in order and each pair's concatenated 32-byte digests
/// are hashed into the next level. A level of odd length duplicates its last
/// element before pairing - this duplication policy is part of the
/// wire-compatible digest and must not change. An empty sequence yields the
/// zero sentinel.
///
/// Leaf order is significant: reordering transactions changes the root.
pub fn merkle_root(leaves: &[Hash256]) -> Hash256 {
    if leaves.is_empty() {
        return Hash256::zero();
    }

    let mut level: Vec<Hash256> = leaves.to_vec();

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            // Duplicate last element on odd levels
            level.push(*level.last().expect("level is non-empty"));
        }

        let mut next_level = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks(2) {
            let mut combined = Vec::with_capacity(64);
            combined.extend_from_slice(pair[0].as_bytes());
            combined.extend_from_slice(pair[1].as_bytes());
            next_level.push(sha256(&combined));
        }

        level = next_level;
    }

    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: u8) -> Hash256 {
        sha256(&[n])
    }

    #[test]
    fn test_empty_sequence_is_zero_sentinel() {
        assert_eq!(merkle_root(&[]), Hash256::zero());
    }

    #[test]
    fn test_single_leaf_is_its_own_root() {
        let l = leaf(1);
        assert_eq!(merkle_root(&[l]), l);
    }

    #[test]
    fn test_deterministic() {
        let leaves = vec![leaf(1), leaf(2), leaf(3), leaf(4)];
        assert_eq!(merkle_root(&leaves), merkle_root(&leaves));
    }

    #[test]
    fn test_sensitive_to_any_leaf_change() {
        let leaves = vec![leaf(1), leaf(2), leaf(3)];
        let root = merkle_root(&leaves);

        for i in 0..leaves.len() {
            let mut mutated = leaves.clone();
            mutated[i] = leaf(99);
            assert_ne!(merkle_root(&mutated), root, "leaf {} change undetected", i);
        }
    }

    #[test]
    fn test_sensitive_to_order() {
        let forward = vec![leaf(1), leaf(2)];
        let reversed = vec![leaf(2), leaf(1)];
        assert_ne!(merkle_root(&forward), merkle_root(&reversed));
    }

    #[test]
    fn test_odd_count_duplicates_last_leaf() {
        // With three leaves the last one is duplicated, so [a, b, c] must
        // equal [a, b, c, c]
        let odd = vec![leaf(1), leaf(2), leaf(3)];
        let padded = vec![leaf(1), leaf(2), leaf(3), leaf(3)];
        assert_eq!(merkle_root(&odd), merkle_root(&padded));
    }

    #[test]
    fn test_two_leaves_match_manual_fold() {
        let a = leaf(1);
        let b = leaf(2);

        let mut combined = Vec::new();
        combined.extend_from_slice(a.as_bytes());
        combined.extend_from_slice(b.as_bytes());

        assert_eq!(merkle_root(&[a, b]), sha256(&combined));
    }
}
