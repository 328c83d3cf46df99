//! Fixed ledger workload run once per trigger message
//!
//! For every trigger message the consumer runs the same four steps against a
//! primary and a secondary account:
//!
//! 1. deposit into the primary account
//! 2. withdraw from the secondary account
//! 3. naive transfer primary → secondary
//! 4. safe (ordered) transfer secondary → primary
//!
//! Rejections are expected outcomes and are only counted.

use super::Ledger;
use crate::types::{Account, LedgerError};
use std::ops::AddAssign;

/// Amounts used by the four workload steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workload {
    pub deposit: u64,
    pub withdraw: u64,
    pub naive_transfer: u64,
    pub safe_transfer: u64,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            deposit: 100,
            withdraw: 50,
            naive_transfer: 200,
            safe_transfer: 100,
        }
    }
}

impl Workload {
    /// Run the four steps in order
    ///
    /// Blocks the calling thread on account locks and on the ledger's hold
    /// delay; async callers must run it on a blocking thread.
    pub fn run(&self, ledger: &Ledger, primary: &Account, secondary: &Account) -> WorkloadReport {
        let mut report = WorkloadReport::default();

        report.record(ledger.deposit(primary, self.deposit));
        report.record(ledger.withdraw(secondary, self.withdraw));
        report.record(ledger.transfer(primary, secondary, self.naive_transfer));
        report.record(ledger.safe_transfer(secondary, primary, self.safe_transfer));

        report
    }
}

/// Tally of workload outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkloadReport {
    /// Operations that changed balances
    pub committed: usize,
    /// Operations rejected with a ledger error
    pub rejected: usize,
}

impl WorkloadReport {
    fn record<T>(&mut self, outcome: Result<T, LedgerError>) {
        match outcome {
            Ok(_) => self.committed += 1,
            Err(_) => self.rejected += 1,
        }
    }

    /// Total operations attempted
    pub fn total(&self) -> usize {
        self.committed + self.rejected
    }
}

impl AddAssign for WorkloadReport {
    fn add_assign(&mut self, other: Self) {
        self.committed += other.committed;
        self.rejected += other.rejected;
    }
}
