//! Transfer strategy module
//!
//! This module defines the Strategy pattern for two-account transfers. Both
//! strategies hold both account locks across the balance check, the debit and
//! the credit, so a transfer is atomic to every observer. They differ only in
//! the order in which the two locks are acquired:
//!
//! - [`NaiveTransfer`] locks the source first, then the destination. Two
//!   concurrent transfers in opposite directions between the same pair of
//!   accounts deadlock.
//! - [`OrderedTransfer`] locks the account with the lower [`AccountId`] first,
//!   whatever its role. Every caller agrees on one global order, so no cycle
//!   of waiting threads can form.
//!
//! Both are kept as named variants of [`StrategyType`] so callers and tests can
//! exercise either one.
//!
//! [`AccountId`]: crate::types::AccountId

use crate::types::account::to_delta;
use crate::types::{Account, AccountId, LedgerError};
use clap::ValueEnum;
use std::fmt;
use std::thread;
use std::time::Duration;
use tracing::{info, trace, warn};

pub mod naive;
pub mod ordered;

pub use naive::NaiveTransfer;
pub use ordered::OrderedTransfer;

/// Available lock acquisition strategies for transfers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum StrategyType {
    /// Source lock first, destination lock second (deadlock-prone)
    Naive,
    /// Lower account id first (deadlock-free)
    Ordered,
}

impl StrategyType {
    /// Operation name reported in transfer events
    pub fn operation(self) -> &'static str {
        match self {
            StrategyType::Naive => "transfer",
            StrategyType::Ordered => "safe_transfer",
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyType::Naive => f.write_str("naive"),
            StrategyType::Ordered => f.write_str("ordered"),
        }
    }
}

/// Lifecycle of a single transfer
///
/// `Pending → LocksAcquired → {Committed | Rejected} → LocksReleased`.
/// Committed and Rejected are the terminal outcomes; nothing is retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferPhase {
    Pending,
    LocksAcquired,
    Committed,
    Rejected,
    LocksReleased,
}

/// Result of a committed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Source account
    pub from: AccountId,
    /// Destination account
    pub to: AccountId,
    /// Amount moved
    pub amount: u64,
    /// Source balance after the debit
    pub from_balance: i64,
    /// Destination balance after the credit
    pub to_balance: i64,
}

/// Transfer strategy trait
///
/// Implementations atomically move `amount` from `from` to `to`, holding both
/// account locks for the whole check/debit/credit sequence.
pub trait TransferStrategy: Send + Sync {
    /// Which named variant this is
    fn kind(&self) -> StrategyType;

    /// Move `amount` from `from` to `to`
    ///
    /// # Returns
    ///
    /// * `Ok(TransferReceipt)` - The transfer committed
    /// * `Err(LedgerError)` - The transfer was rejected; neither balance changed
    fn transfer(
        &self,
        from: &Account,
        to: &Account,
        amount: u64,
    ) -> Result<TransferReceipt, LedgerError>;
}

/// Create a transfer strategy of the given type
///
/// # Arguments
///
/// * `strategy_type` - Which lock acquisition order to use
/// * `hold_delay` - Pause between taking the first and the second lock; widens
///   the race window so contention can be reproduced on demand
pub fn create_strategy(
    strategy_type: StrategyType,
    hold_delay: Duration,
) -> Box<dyn TransferStrategy> {
    match strategy_type {
        StrategyType::Naive => Box::new(NaiveTransfer::new(hold_delay)),
        StrategyType::Ordered => Box::new(OrderedTransfer::new(hold_delay)),
    }
}

/// Validate a transfer request before any lock is taken
fn precheck(from: &Account, to: &Account, amount: u64) -> Result<i64, LedgerError> {
    if from.id() == to.id() {
        return Err(LedgerError::SameAccount { account: from.id() });
    }
    to_delta(amount)
}

/// Simulated work while the first lock is held
fn hold(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

fn trace_phase(kind: StrategyType, from: &Account, to: &Account, phase: TransferPhase) {
    trace!(
        strategy = %kind,
        from = %from.name(),
        to = %to.name(),
        phase = ?phase,
        "transfer phase"
    );
}

/// Check, debit and credit with both locks already held
///
/// `from_balance` and `to_balance` are the guarded balances of `from` and
/// `to`; the caller owns the guards and releases them afterwards.
fn settle(
    kind: StrategyType,
    from: &Account,
    from_balance: &mut i64,
    to: &Account,
    to_balance: &mut i64,
    amount: u64,
    delta: i64,
) -> Result<TransferReceipt, LedgerError> {
    let outcome = if *from_balance < delta {
        Err(LedgerError::insufficient_funds(
            from.name(),
            *from_balance,
            amount,
        ))
    } else {
        to_balance
            .checked_add(delta)
            .ok_or_else(|| LedgerError::arithmetic_overflow(kind.operation(), to.name()))
    };

    match outcome {
        Ok(credited) => {
            *from_balance -= delta;
            *to_balance = credited;
            trace_phase(kind, from, to, TransferPhase::Committed);
            info!(
                from = %from.name(),
                to = %to.name(),
                operation = kind.operation(),
                amount,
                from_balance = *from_balance,
                to_balance = *to_balance,
                "transfer committed"
            );
            Ok(TransferReceipt {
                from: from.id(),
                to: to.id(),
                amount,
                from_balance: *from_balance,
                to_balance: *to_balance,
            })
        }
        Err(error) => {
            trace_phase(kind, from, to, TransferPhase::Rejected);
            warn!(
                from = %from.name(),
                to = %to.name(),
                operation = kind.operation(),
                amount,
                reason = error.reason(),
                "transfer rejected"
            );
            Err(error)
        }
    }
}
