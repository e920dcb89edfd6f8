// Pending transaction pool

use crate::core::{Hash256, Transaction};
use std::collections::HashSet;

/// Submitted, not-yet-mined transactions in submission order.
///
/// Insertion order is preserved because it becomes block inclusion order,
/// which the Merkle root depends on. Duplicate IDs are ignored.
#[derive(Debug, Default)]
pub struct Mempool {
    transactions: Vec<Transaction>,
    ids: HashSet<Hash256>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction. Returns false if its ID is already pooled.
    pub fn insert(&mut self, tx: Transaction) -> bool {
        if !self.ids.insert(tx.tx_hash) {
            return false;
        }
        self.transactions.push(tx);
        true
    }

    pub fn contains(&self, id: &Hash256) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Pending transactions in submission order
    pub fn pending(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Drop the given IDs (mined into a block, or rejected at assembly)
    pub fn remove(&mut self, ids: &[Hash256]) {
        if ids.is_empty() {
            return;
        }
        let drop: HashSet<&Hash256> = ids.iter().collect();
        self.transactions.retain(|tx| !drop.contains(&tx.tx_hash));
        for id in ids {
            self.ids.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(nonce: u64) -> Transaction {
        Transaction::from_parts("alice".into(), "bob".into(), 10, 1, nonce, 1000)
    }

    #[test]
    fn test_insert_and_dedup() {
        let mut pool = Mempool::new();
        let t = tx(1);

        assert!(pool.insert(t.clone()));
        assert!(!pool.insert(t.clone()));
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&t.tx_hash));
    }

    #[test]
    fn test_preserves_submission_order() {
        let mut pool = Mempool::new();
        let (a, b, c) = (tx(1), tx(2), tx(3));
        pool.insert(a.clone());
        pool.insert(b.clone());
        pool.insert(c.clone());

        let order: Vec<Hash256> = pool.pending().iter().map(|t| t.tx_hash).collect();
        assert_eq!(order, vec![a.tx_hash, b.tx_hash, c.tx_hash]);
    }

    #[test]
    fn test_remove_confirmed() {
        let mut pool = Mempool::new();
        let (a, b) = (tx(1), tx(2));
        pool.insert(a.clone());
        pool.insert(b.clone());

        pool.remove(&[a.tx_hash]);
        assert_eq!(pool.len(), 1);
        assert!(!pool.contains(&a.tx_hash));
        assert!(pool.contains(&b.tx_hash));

        // Removed IDs can be re-submitted
        assert!(pool.insert(a));
    }
}
