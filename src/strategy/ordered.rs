//! Canonically ordered transfer strategy
//!
//! Locks are always taken lowest [`AccountId`] first, regardless of which
//! account is the source. Since every transfer climbs the same total order, a
//! thread holding a lock only ever waits for a lock with a higher id, and no
//! cycle of waiters can exist for any number of threads or accounts.
//!
//! [`AccountId`]: crate::types::AccountId

use super::{hold, precheck, settle, trace_phase, TransferPhase, TransferReceipt, TransferStrategy};
use crate::strategy::StrategyType;
use crate::types::{Account, LedgerError};
use std::time::Duration;

/// Lowest-id-first locking
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderedTransfer {
    /// Pause after taking the first lock
    hold_delay: Duration,
}

impl OrderedTransfer {
    pub fn new(hold_delay: Duration) -> Self {
        Self { hold_delay }
    }
}

impl TransferStrategy for OrderedTransfer {
    fn kind(&self) -> StrategyType {
        StrategyType::Ordered
    }

    fn transfer(
        &self,
        from: &Account,
        to: &Account,
        amount: u64,
    ) -> Result<TransferReceipt, LedgerError> {
        let delta = precheck(from, to, amount)?;
        trace_phase(self.kind(), from, to, TransferPhase::Pending);

        let from_first = from.id() < to.id();
        let (first, second) = if from_first { (from, to) } else { (to, from) };

        let mut first_balance = first.lock();
        hold(self.hold_delay);
        let mut second_balance = second.lock();
        trace_phase(self.kind(), from, to, TransferPhase::LocksAcquired);

        let (from_balance, to_balance) = if from_first {
            (&mut *first_balance, &mut *second_balance)
        } else {
            (&mut *second_balance, &mut *first_balance)
        };
        let outcome = settle(self.kind(), from, from_balance, to, to_balance, amount, delta);

        drop(second_balance);
        drop(first_balance);
        trace_phase(self.kind(), from, to, TransferPhase::LocksReleased);

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_safe_transfer_moves_funds() {
        let strategy = OrderedTransfer::default();
        let acc1 = Account::new("Acc1", 1100);
        let acc2 = Account::new("Acc2", 1000);

        let receipt = strategy.transfer(&acc1, &acc2, 200).unwrap();

        assert_eq!(
            receipt,
            TransferReceipt {
                from: acc1.id(),
                to: acc2.id(),
                amount: 200,
                from_balance: 900,
                to_balance: 1200,
            }
        );
        assert_eq!(acc1.balance(), 900);
        assert_eq!(acc2.balance(), 1200);
    }

    #[test]
    fn test_safe_transfer_from_higher_id_keeps_roles() {
        let strategy = OrderedTransfer::default();
        let low = Account::new("Low", 0);
        let high = Account::new("High", 500);

        let receipt = strategy.transfer(&high, &low, 300).unwrap();

        assert_eq!(receipt.from, high.id());
        assert_eq!(receipt.from_balance, 200);
        assert_eq!(receipt.to_balance, 300);
        assert_eq!(high.balance(), 200);
        assert_eq!(low.balance(), 300);
    }

    #[test]
    fn test_safe_transfer_insufficient_funds_changes_nothing() {
        let strategy = OrderedTransfer::default();
        let from = Account::new("Poor", 50);
        let to = Account::new("Rich", 5000);

        let result = strategy.transfer(&from, &to, 51);

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(from.balance(), 50);
        assert_eq!(to.balance(), 5000);
    }

    #[test]
    fn test_concurrent_opposite_transfers_both_commit() {
        let strategy = Arc::new(OrderedTransfer::new(Duration::from_millis(50)));
        let a = Arc::new(Account::new("A", 1000));
        let b = Arc::new(Account::new("B", 1000));

        let forward = {
            let (strategy, a, b) = (Arc::clone(&strategy), Arc::clone(&a), Arc::clone(&b));
            thread::spawn(move || strategy.transfer(&a, &b, 100))
        };
        let backward = {
            let (strategy, a, b) = (Arc::clone(&strategy), Arc::clone(&a), Arc::clone(&b));
            thread::spawn(move || strategy.transfer(&b, &a, 50))
        };

        assert!(forward.join().unwrap().is_ok());
        assert!(backward.join().unwrap().is_ok());
        assert_eq!(a.balance(), 950);
        assert_eq!(b.balance(), 1050);
        assert_eq!(a.balance() + b.balance(), 2000);
    }
}
