// Transaction data structure

use crate::core::{sha256, Address, Hash256};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A transfer record. Immutable once built: the `tx_hash` field is a digest
/// of every other field and is recomputable by anyone holding the
/// transaction.
///
/// The `nonce` is a client-supplied random value that disambiguates two
/// otherwise identical transfers created in the same instant; without it the
/// content identifier would collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender account identifier
    pub sender: Address,
    /// Receiver account identifier
    pub receiver: Address,
    /// Transferred amount
    pub amount: u64,
    /// Flat fee credited to the block's miner
    pub fee: u64,
    /// Client-supplied disambiguator
    pub nonce: u64,
    /// Creation time, milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Content identifier: digest of all fields above
    pub tx_hash: Hash256,
}

impl Transaction {
    /// Build a transaction stamped with the current time and a random nonce.
    /// Signing, if any, happens outside the core before submission.
    pub fn new(sender: Address, receiver: Address, amount: u64, fee: u64) -> Self {
        Self::from_parts(sender, receiver, amount, fee, rand::random(), now_millis())
    }

    /// Build a transaction from explicit fields and derive its identifier
    pub fn from_parts(
        sender: Address,
        receiver: Address,
        amount: u64,
        fee: u64,
        nonce: u64,
        timestamp: u64,
    ) -> Self {
        let mut tx = Self {
            sender,
            receiver,
            amount,
            fee,
            nonce,
            timestamp,
            tx_hash: Hash256::zero(),
        };
        tx.tx_hash = tx.compute_hash();
        tx
    }

    /// Recompute the content identifier from the other fields
    pub fn compute_hash(&self) -> Hash256 {
        let mut data = Vec::new();

        // Length-prefixed identifiers so (ab, c) and (a, bc) cannot collide
        data.extend_from_slice(&(self.sender.len() as u64).to_le_bytes());
        data.extend_from_slice(self.sender.as_bytes());
        data.extend_from_slice(&(self.receiver.len() as u64).to_le_bytes());
        data.extend_from_slice(self.receiver.as_bytes());

        data.extend_from_slice(&self.amount.to_le_bytes());
        data.extend_from_slice(&self.fee.to_le_bytes());
        data.extend_from_slice(&self.nonce.to_le_bytes());
        data.extend_from_slice(&self.timestamp.to_le_bytes());

        sha256(&data)
    }

    /// Check that the stored identifier matches the recomputed one
    pub fn verify_hash(&self) -> bool {
        self.tx_hash == self.compute_hash()
    }
}

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_recomputable() {
        let tx = Transaction::from_parts("alice".into(), "bob".into(), 30, 2, 7, 1_700_000_000_000);
        assert_eq!(tx.tx_hash, tx.compute_hash());
        assert!(tx.verify_hash());
    }

    #[test]
    fn test_hash_changes_with_each_field() {
        let base = Transaction::from_parts("alice".into(), "bob".into(), 30, 2, 7, 1000);

        let variants = [
            Transaction::from_parts("carol".into(), "bob".into(), 30, 2, 7, 1000),
            Transaction::from_parts("alice".into(), "carol".into(), 30, 2, 7, 1000),
            Transaction::from_parts("alice".into(), "bob".into(), 31, 2, 7, 1000),
            Transaction::from_parts("alice".into(), "bob".into(), 30, 3, 7, 1000),
            Transaction::from_parts("alice".into(), "bob".into(), 30, 2, 8, 1000),
            Transaction::from_parts("alice".into(), "bob".into(), 30, 2, 7, 1001),
        ];

        for variant in &variants {
            assert_ne!(variant.tx_hash, base.tx_hash);
        }
    }

    #[test]
    fn test_tampered_transaction_fails_verification() {
        let mut tx = Transaction::from_parts("alice".into(), "bob".into(), 30, 2, 7, 1000);
        tx.amount = 3000;
        assert!(!tx.verify_hash());
    }

    #[test]
    fn test_nonce_disambiguates_identical_transfers() {
        // Same sender/receiver/amount/fee/timestamp, different nonce
        let a = Transaction::from_parts("alice".into(), "bob".into(), 30, 2, 1, 1000);
        let b = Transaction::from_parts("alice".into(), "bob".into(), 30, 2, 2, 1000);
        assert_ne!(a.tx_hash, b.tx_hash);
    }

    #[test]
    fn test_wire_shape() {
        let tx = Transaction::from_parts("alice".into(), "bob".into(), 30, 2, 7, 1000);
        let json = serde_json::to_value(&tx).unwrap();

        assert_eq!(json["sender"], "alice");
        assert_eq!(json["receiver"], "bob");
        assert_eq!(json["amount"], 30);
        assert_eq!(json["fee"], 2);
        assert_eq!(json["tx_hash"], tx.tx_hash.to_hex());

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }
}
