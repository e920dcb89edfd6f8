// Hashing primitive

use crate::core::Hash256;
use sha2::{Digest, Sha256};

/// Single SHA-256 over arbitrary bytes.
///
/// Every identifier in the system comes from this one function: transaction
/// IDs, Merkle nodes, and block hashes (which are also the proof-of-work
/// target). No other checksum is used anywhere.
pub fn sha256(data: &[u8]) -> Hash256 {
    let digest = Sha256::digest(data);
    Hash256::from_slice(&digest).expect("SHA256 always returns 32 bytes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_deterministic() {
        let data = b"hello world";
        let hash = sha256(data);
        assert_eq!(hash.as_bytes().len(), 32);

        // Same data should produce same hash
        let hash2 = sha256(data);
        assert_eq!(hash, hash2);
    }

    #[test]
    fn test_sha256_known_vector() {
        // sha256("abc")
        let hash = sha256(b"abc");
        assert_eq!(
            hash.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_empty() {
        let hash = sha256(b"");
        assert_eq!(hash.as_bytes().len(), 32);
        assert_ne!(hash, Hash256::zero());
    }
}
