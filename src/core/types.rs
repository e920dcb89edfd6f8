// Basic types shared across the chain

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 256-bit digest (32 bytes)
/// Used for block hashes, transaction IDs, and Merkle roots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Create a new Hash256 from a byte array
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a Hash256 from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, String> {
        if slice.len() != 32 {
            return Err(format!(
                "Invalid hash length: expected 32, got {}",
                slice.len()
            ));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Get the hash as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Zero digest. Doubles as the genesis "no parent" sentinel and the
    /// empty-Merkle sentinel.
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Convert to a lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, String> {
        let bytes = hex::decode(hex_str).map_err(|e| format!("Invalid hex string: {}", e))?;
        Self::from_slice(&bytes)
    }

    /// Count of leading zero hex symbols in the rendered digest.
    /// This is what the difficulty predicate is measured in.
    pub fn leading_zero_digits(&self) -> u32 {
        let mut count = 0;
        for byte in &self.0 {
            if *byte == 0 {
                count += 2;
            } else {
                if *byte >> 4 == 0 {
                    count += 1;
                }
                break;
            }
        }
        count
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// Hashes travel as hex strings on the wire
impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash256::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Account identifier. Opaque to the core: whatever string the wallet layer
/// hands us (the core never inspects or verifies it).
pub type Address = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash256_creation() {
        let hash = Hash256::new([1u8; 32]);
        assert_eq!(hash.as_bytes(), &[1u8; 32]);
    }

    #[test]
    fn test_hash256_zero() {
        let zero = Hash256::zero();
        assert_eq!(zero.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn test_hash256_hex_round_trip() {
        let hash = Hash256::new([
            0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66,
            0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x00, 0x01, 0x02, 0x03, 0x04,
            0x05, 0x06, 0x07, 0x08,
        ]);
        let hex = hash.to_hex();
        let decoded = Hash256::from_hex(&hex).unwrap();
        assert_eq!(hash, decoded);
    }

    #[test]
    fn test_hash256_json_is_hex_string() {
        let hash = Hash256::new([0xab; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));

        let back: Hash256 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_leading_zero_digits() {
        assert_eq!(Hash256::zero().leading_zero_digits(), 64);
        assert_eq!(Hash256::new([0xff; 32]).leading_zero_digits(), 0);

        let mut bytes = [0xffu8; 32];
        bytes[0] = 0x00;
        bytes[1] = 0x0f;
        assert_eq!(Hash256::new(bytes).leading_zero_digits(), 3);
    }
}
