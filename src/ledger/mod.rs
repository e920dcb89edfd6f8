// Account balance ledger

use crate::core::{Address, Transaction};
use std::collections::HashMap;
use std::fmt;

/// Ledger rejection reasons
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A sender cannot cover amount + fee
    InsufficientFunds {
        account: Address,
        required: u64,
        available: u64,
    },
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LedgerError::InsufficientFunds {
                account,
                required,
                available,
            } => write!(
                f,
                "Insufficient funds for {}: required {}, available {}",
                account, required, available
            ),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Mapping of account identifier to balance.
///
/// Accounts are seeded with a fixed opening balance the first time they are
/// referenced. The only mutation path is [`apply_batch`](Self::apply_batch),
/// which applies an entire block's transactions atomically: staged updates
/// are committed only once every transaction in the batch has cleared, so a
/// rejected batch leaves the live balances untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    balances: HashMap<Address, u64>,
    opening_balance: u64,
}

impl Ledger {
    /// Create an empty ledger with the given opening balance for new accounts
    pub fn new(opening_balance: u64) -> Self {
        Self {
            balances: HashMap::new(),
            opening_balance,
        }
    }

    /// Current balance of an account (opening balance if never referenced)
    pub fn balance(&self, account: &str) -> u64 {
        self.balances
            .get(account)
            .copied()
            .unwrap_or(self.opening_balance)
    }

    /// Opening balance granted to unseen accounts
    pub fn opening_balance(&self) -> u64 {
        self.opening_balance
    }

    /// Apply a block's transactions atomically.
    ///
    /// For each transaction in order, the sender pays amount + fee, the
    /// receiver gains the amount, and the beneficiary gains the fee. If any
    /// sender cannot cover its debit the whole batch is rejected and no
    /// balance changes.
    pub fn apply_batch(
        &mut self,
        transactions: &[Transaction],
        beneficiary: &str,
    ) -> Result<(), LedgerError> {
        let mut staged: HashMap<Address, u64> = HashMap::new();

        for tx in transactions {
            let available = *staged
                .entry(tx.sender.clone())
                .or_insert_with(|| self.balance(&tx.sender));

            let required = tx.amount.checked_add(tx.fee).ok_or_else(|| {
                LedgerError::InsufficientFunds {
                    account: tx.sender.clone(),
                    required: u64::MAX,
                    available,
                }
            })?;

            if available < required {
                return Err(LedgerError::InsufficientFunds {
                    account: tx.sender.clone(),
                    required,
                    available,
                });
            }

            *staged.get_mut(&tx.sender).expect("seeded above") = available - required;

            let receiver = staged
                .entry(tx.receiver.clone())
                .or_insert_with(|| self.balance(&tx.receiver));
            *receiver = receiver.saturating_add(tx.amount);

            let miner = staged
                .entry(beneficiary.to_string())
                .or_insert_with(|| self.balance(beneficiary));
            *miner = miner.saturating_add(tx.fee);
        }

        // Commit: every transaction cleared
        self.balances.extend(staged);
        Ok(())
    }

    /// Check whether a batch would apply cleanly, without mutating anything
    pub fn can_apply(&self, transactions: &[Transaction], beneficiary: &str) -> bool {
        self.clone().apply_batch(transactions, beneficiary).is_ok()
    }
}
