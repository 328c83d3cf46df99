//! Unordered transfer strategy
//!
//! Locks the source account, waits the configured hold delay, then locks the
//! destination account while still holding the source. When one thread runs
//! A→B while another runs B→A, each holds the lock the other needs next and
//! both wait forever.
//!
//! This strategy is kept on purpose: it is the reference for what the ordered
//! strategy prevents. Nothing here detects or breaks the deadlock.

use super::{hold, precheck, settle, trace_phase, TransferPhase, TransferReceipt, TransferStrategy};
use crate::strategy::StrategyType;
use crate::types::{Account, LedgerError};
use std::time::Duration;

/// Source-then-destination locking
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveTransfer {
    /// Pause after taking the source lock
    hold_delay: Duration,
}

impl NaiveTransfer {
    pub fn new(hold_delay: Duration) -> Self {
        Self { hold_delay }
    }
}

impl TransferStrategy for NaiveTransfer {
    fn kind(&self) -> StrategyType {
        StrategyType::Naive
    }

    fn transfer(
        &self,
        from: &Account,
        to: &Account,
        amount: u64,
    ) -> Result<TransferReceipt, LedgerError> {
        let delta = precheck(from, to, amount)?;
        trace_phase(self.kind(), from, to, TransferPhase::Pending);

        let mut from_balance = from.lock();
        hold(self.hold_delay);
        let mut to_balance = to.lock();
        trace_phase(self.kind(), from, to, TransferPhase::LocksAcquired);

        let outcome = settle(
            self.kind(),
            from,
            &mut from_balance,
            to,
            &mut to_balance,
            amount,
            delta,
        );

        drop(to_balance);
        drop(from_balance);
        trace_phase(self.kind(), from, to, TransferPhase::LocksReleased);

        outcome
    }
}
