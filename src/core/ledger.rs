//! Transfer engine
//!
//! The `Ledger` is the single entry point for balance operations. Single-account
//! operations go straight to the account; two-account transfers go through one
//! of the two transfer strategies, both of which share the same injectable
//! hold delay.

use crate::strategy::{
    NaiveTransfer, OrderedTransfer, StrategyType, TransferReceipt, TransferStrategy,
};
use crate::types::{Account, LedgerError};
use std::time::Duration;

/// Orchestrates deposits, withdrawals and transfers over shared accounts
#[derive(Debug, Clone, Copy, Default)]
pub struct Ledger {
    naive: NaiveTransfer,
    ordered: OrderedTransfer,
}

impl Ledger {
    /// Create a ledger whose transfers pause `hold_delay` between their two
    /// lock acquisitions
    pub fn new(hold_delay: Duration) -> Self {
        Self {
            naive: NaiveTransfer::new(hold_delay),
            ordered: OrderedTransfer::new(hold_delay),
        }
    }

    pub fn deposit(&self, account: &Account, amount: u64) -> Result<i64, LedgerError> {
        account.deposit(amount)
    }

    pub fn withdraw(&self, account: &Account, amount: u64) -> Result<i64, LedgerError> {
        account.withdraw(amount)
    }

    /// Unordered transfer: source lock first
    ///
    /// Deadlocks when run concurrently with a transfer in the opposite
    /// direction between the same accounts.
    pub fn transfer(
        &self,
        from: &Account,
        to: &Account,
        amount: u64,
    ) -> Result<TransferReceipt, LedgerError> {
        self.naive.transfer(from, to, amount)
    }

    /// Canonically ordered transfer: lower account id first
    pub fn safe_transfer(
        &self,
        from: &Account,
        to: &Account,
        amount: u64,
    ) -> Result<TransferReceipt, LedgerError> {
        self.ordered.transfer(from, to, amount)
    }

    /// Transfer using the named strategy
    pub fn transfer_with(
        &self,
        kind: StrategyType,
        from: &Account,
        to: &Account,
        amount: u64,
    ) -> Result<TransferReceipt, LedgerError> {
        self.strategy(kind).transfer(from, to, amount)
    }

    pub fn strategy(&self, kind: StrategyType) -> &dyn TransferStrategy {
        match kind {
            StrategyType::Naive => &self.naive,
            StrategyType::Ordered => &self.ordered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Bank;
    use rstest::rstest;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_scenario_deposit() {
        let ledger = Ledger::default();
        let acc1 = Account::new("Acc1", 1000);

        assert_eq!(ledger.deposit(&acc1, 100), Ok(1100));
    }

    #[test]
    fn test_scenario_withdraw_insufficient() {
        let ledger = Ledger::default();
        let acc2 = Account::new("Acc2", 1000);

        let result = ledger.withdraw(&acc2, 1500);

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(acc2.balance(), 1000);
    }

    #[test]
    fn test_scenario_safe_transfer() {
        let ledger = Ledger::default();
        let acc1 = Account::new("Acc1", 1100);
        let acc2 = Account::new("Acc2", 1000);

        let receipt = ledger.safe_transfer(&acc1, &acc2, 200).unwrap();

        assert_eq!((receipt.from_balance, receipt.to_balance), (900, 1200));
        assert_eq!((acc1.balance(), acc2.balance()), (900, 1200));
    }

    #[rstest]
    #[case::naive(StrategyType::Naive)]
    #[case::ordered(StrategyType::Ordered)]
    fn test_transfer_with_dispatches(#[case] kind: StrategyType) {
        let ledger = Ledger::default();
        let from = Account::new("From", 10);
        let to = Account::new("To", 0);

        assert_eq!(ledger.strategy(kind).kind(), kind);
        assert!(ledger.transfer_with(kind, &from, &to, 10).is_ok());
        assert!(ledger.transfer_with(kind, &from, &to, 1).is_err());
        assert_eq!((from.balance(), to.balance()), (0, 10));
    }

    #[test]
    fn test_concurrent_mixed_operations_conserve_total() {
        let ledger = Arc::new(Ledger::new(Duration::from_millis(1)));
        let bank = Arc::new(Bank::new());
        let accounts: Vec<Arc<Account>> = (0..4)
            .map(|i| bank.open(format!("acc{}", i), 500))
            .collect();
        let accounts = Arc::new(accounts);
        let mut handles = vec![];

        // Each thread returns the net amount it added to the bank
        for t in 0..12usize {
            let (ledger, accounts) = (Arc::clone(&ledger), Arc::clone(&accounts));
            handles.push(thread::spawn(move || {
                let mut net: i128 = 0;
                for step in 0..25usize {
                    let from = &accounts[(t + step) % 4];
                    let to = &accounts[(t + step * 3 + 1) % 4];
                    match (t + step) % 3 {
                        0 => {
                            ledger.deposit(from, 7).unwrap();
                            net += 7;
                        }
                        1 => {
                            if ledger.withdraw(from, 40).is_ok() {
                                net -= 40;
                            }
                        }
                        _ => {
                            if from.id() != to.id() {
                                let _ = ledger.safe_transfer(from, to, 120);
                            }
                        }
                    }
                }
                net
            }));
        }

        let net: i128 = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(bank.total_balance(), 4 * 500 + net);
        for account in accounts.iter() {
            assert!(account.balance() >= 0);
        }
    }
}
