//! Contended Ledger Library
//! # Overview
//!
//! This library moves money between accounts guarded by individual locks and
//! drives that ledger from a stream of trigger messages.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, AccountId, TriggerMessage, errors)
//! - [`strategy`] - Transfer strategies: naive (deadlock-prone) and ordered (deadlock-free)
//! - [`core`] - Business logic components:
//!   - [`core::bank`] - Registry of open accounts
//!   - [`core::ledger`] - Deposit, withdraw and the two transfer operations
//!   - [`core::workload`] - The ledger operations run per trigger message
//! - [`io`] - Trigger channel (transports, framing, producer, consumer) and CSV output
//! - [`orchestrator`] - Runs producer and consumer to completion
//! - [`contention`] - Opposite-direction transfer probe
//! - [`cli`] - CLI arguments parsing
//! - [`logging`] - `tracing` subscriber setup
//!
//! # Transfers
//!
//! A transfer holds both account locks while it checks and moves funds:
//!
//! - **Naive**: locks the source, pauses, then locks the destination. Two
//!   opposite transfers between the same pair can deadlock.
//! - **Ordered**: locks the account with the smaller id first regardless of
//!   direction, so no cycle of waiting transfers can form.
//!
//! The sum of all balances only changes through deposits and withdrawals.

// Module declarations
pub mod cli;
pub mod contention;
pub mod core;
pub mod io;
pub mod logging;
pub mod orchestrator;
pub mod strategy;
pub mod types;

pub use contention::{run_contention, ContentionConfig, ContentionReport};
pub use core::{Bank, Ledger, Workload, WorkloadReport};
pub use io::{write_balances_csv, Transport};
pub use orchestrator::{run_pipeline, PipelineConfig, PipelineReport};
pub use strategy::{create_strategy, StrategyType, TransferStrategy};
pub use types::{Account, AccountId, AccountSnapshot, LedgerError, TriggerError, TriggerMessage};
