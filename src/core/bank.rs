//! Thread-safe registry of opened accounts
//!
//! The `Bank` hands out `Arc<Account>` handles and keeps every account it
//! opened so the final state can be reported and the conservation of the total
//! balance can be checked.
//!
//! # Locking
//!
//! The registry map (`DashMap`) and the per-account mutexes are never held at
//! the same time: snapshots first collect the account handles, release the map,
//! and only then read each balance under its own lock.

use crate::types::{Account, AccountId, AccountSnapshot};
use dashmap::DashMap;
use std::sync::Arc;

/// Registry of accounts keyed by their stable identity
#[derive(Debug, Default)]
pub struct Bank {
    /// Opened accounts by id
    accounts: DashMap<AccountId, Arc<Account>>,
}

impl Bank {
    /// Create an empty bank
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Open a new account and register it
    ///
    /// # Returns
    ///
    /// A shared handle to the account. Its id is higher than the id of every
    /// account opened before it.
    pub fn open(&self, name: impl Into<String>, initial_balance: i64) -> Arc<Account> {
        let account = Arc::new(Account::new(name, initial_balance));
        self.accounts.insert(account.id(), Arc::clone(&account));
        account
    }

    /// Look up an account by id
    pub fn get(&self, id: AccountId) -> Option<Arc<Account>> {
        self.accounts.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// All accounts sorted by id
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        let mut accounts: Vec<Arc<Account>> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        accounts.sort_by_key(|account| account.id());
        accounts
    }

    /// Snapshots of all accounts sorted by id
    pub fn snapshots(&self) -> Vec<AccountSnapshot> {
        self.accounts()
            .iter()
            .map(|account| account.snapshot())
            .collect()
    }

    /// Sum of all balances
    ///
    /// Each balance is read under its own lock, one account at a time; the sum
    /// is only meaningful once concurrent operations have finished.
    pub fn total_balance(&self) -> i128 {
        self.accounts()
            .iter()
            .map(|account| i128::from(account.balance()))
            .sum()
    }
}
