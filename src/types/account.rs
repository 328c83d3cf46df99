//! Account-related types for the contended ledger
//!
//! This module defines the Account structure: a named balance guarded by its
//! own exclusive lock, plus the stable identity used to order lock acquisition.

use super::error::LedgerError;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// Source of account identities, shared by every account in the process
static NEXT_ACCOUNT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable account identity
///
/// Assigned from a process-wide counter when the account is created, so ids are
/// unique and strictly increasing in creation order. The ordered transfer
/// strategy sorts lock acquisition by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AccountId(u64);

impl AccountId {
    /// Wrap a raw identity value
    pub fn new(raw: u64) -> Self {
        AccountId(raw)
    }

    /// Allocate the next unused identity
    fn next() -> Self {
        AccountId(NEXT_ACCOUNT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identity value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A bank account with a lock-protected balance
///
/// The balance is only ever read or written while the account's own mutex is
/// held. Accounts are shared between threads through `Arc<Account>`; no
/// operation ever copies a balance out to mutate it elsewhere.
#[derive(Debug)]
pub struct Account {
    /// Identity used for canonical lock ordering
    id: AccountId,

    /// Human-readable name, immutable after creation
    name: String,

    /// Current balance, guarded by the account's exclusive lock
    balance: Mutex<i64>,
}

impl Account {
    /// Create an account with the given initial balance and a fresh identity
    pub fn new(name: impl Into<String>, initial_balance: i64) -> Self {
        Account {
            id: AccountId::next(),
            name: name.into(),
            balance: Mutex::new(initial_balance),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current balance, read under the account lock
    pub fn balance(&self) -> i64 {
        *self.lock()
    }

    /// Point-in-time copy of the account for reporting
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            name: self.name.clone(),
            balance: self.balance(),
        }
    }

    /// Credit `amount` to the account
    ///
    /// # Returns
    ///
    /// * `Ok(balance)` - The balance after the deposit
    /// * `Err(LedgerError)` - If the amount is not representable or the credit
    ///   would overflow; the balance is unchanged
    pub fn deposit(&self, amount: u64) -> Result<i64, LedgerError> {
        let delta = to_delta(amount)?;
        let mut balance = self.lock();
        *balance = balance
            .checked_add(delta)
            .ok_or_else(|| LedgerError::arithmetic_overflow("deposit", &self.name))?;
        info!(
            account = %self.name,
            operation = "deposit",
            amount,
            balance = *balance,
            "deposit applied"
        );
        Ok(*balance)
    }

    /// Debit `amount` from the account if the balance covers it
    ///
    /// Insufficient funds is an expected outcome, reported as
    /// `LedgerError::InsufficientFunds` with the balance left untouched.
    pub fn withdraw(&self, amount: u64) -> Result<i64, LedgerError> {
        let delta = to_delta(amount)?;
        let mut balance = self.lock();
        if *balance < delta {
            warn!(
                account = %self.name,
                operation = "withdraw",
                amount,
                balance = *balance,
                reason = "insufficient_funds",
                "withdrawal rejected"
            );
            return Err(LedgerError::insufficient_funds(&self.name, *balance, amount));
        }
        *balance -= delta;
        info!(
            account = %self.name,
            operation = "withdraw",
            amount,
            balance = *balance,
            "withdrawal applied"
        );
        Ok(*balance)
    }

    /// Acquire the account's exclusive lock
    ///
    /// Critical sections never panic half-way through a balance update, so a
    /// poisoned lock still guards a consistent value and is recovered.
    pub(crate) fn lock(&self) -> MutexGuard<'_, i64> {
        self.balance.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Convert an unsigned amount into a signed balance delta
pub(crate) fn to_delta(amount: u64) -> Result<i64, LedgerError> {
    i64::try_from(amount).map_err(|_| LedgerError::InvalidAmount { amount })
}

/// Serializable point-in-time view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSnapshot {
    /// Account identity
    #[serde(rename = "account")]
    pub id: AccountId,

    /// Account name
    pub name: String,

    /// Balance at the time of the snapshot
    pub balance: i64,
}
