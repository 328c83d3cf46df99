//! Core business logic module
//!
//! This module contains the ledger components:
//! - `bank` - Concurrent registry of opened accounts
//! - `ledger` - Deposit/withdraw/transfer entry point over both transfer strategies
//! - `workload` - The fixed operation sequence run for each trigger message

pub mod bank;
pub mod ledger;
pub mod workload;

pub use bank::Bank;
pub use ledger::Ledger;
pub use workload::{Workload, WorkloadReport};
