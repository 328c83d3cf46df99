//! Error types for the contended ledger
//!
//! This module defines all error types that can occur while operating on
//! accounts or while moving trigger messages across the channel.
//!
//! # Error Categories
//!
//! - **Ledger Errors**: Insufficient funds, invalid amounts, overflow. These are
//!   expected outcomes; the operation is rejected and no balance changes.
//! - **Trigger Errors**: Bind, accept, connect, read and write failures on the
//!   trigger channel. They end the loop of the task that hit them.

use super::account::AccountId;
use thiserror::Error;

/// Error type for account and transfer operations
///
/// Every variant is non-fatal: the rejected operation leaves all balances
/// untouched and the caller simply continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Withdrawal or transfer larger than the source balance
    #[error("Insufficient funds in {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Name of the account that was short
        account: String,
        /// Balance observed under the account lock
        balance: i64,
        /// Requested debit
        requested: u64,
    },

    /// Transfer whose source and destination are the same account
    #[error("Cannot transfer from account {account} to itself")]
    SameAccount {
        /// Identity of the account
        account: AccountId,
    },

    /// Amount that cannot be represented as a balance delta
    #[error("Invalid amount {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: u64,
    },

    /// Credit that would overflow the balance
    #[error("Arithmetic overflow in {operation} for {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Name of the account
        account: String,
    },
}

impl LedgerError {
    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: &str, balance: i64, requested: u64) -> Self {
        LedgerError::InsufficientFunds {
            account: account.to_string(),
            balance,
            requested,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account: account.to_string(),
        }
    }

    /// Short machine-friendly reason, used as the `reason` field of rejection events
    pub fn reason(&self) -> &'static str {
        match self {
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::SameAccount { .. } => "same_account",
            LedgerError::InvalidAmount { .. } => "invalid_amount",
            LedgerError::ArithmeticOverflow { .. } => "arithmetic_overflow",
        }
    }
}

/// Error type for the trigger channel and its tasks
///
/// Transport failures are caught at the producer/consumer boundary, logged,
/// and handed back to the orchestrator's task group as values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    /// The server endpoint could not be created
    #[error("Failed to listen on {endpoint}: {message}")]
    Bind {
        /// Endpoint description (address, path or "memory")
        endpoint: String,
        /// Description of the underlying failure
        message: String,
    },

    /// Waiting for the consumer to attach failed
    #[error("Failed to accept consumer on {endpoint}: {message}")]
    Accept {
        /// Endpoint description
        endpoint: String,
        /// Description of the underlying failure
        message: String,
    },

    /// The consumer could not reach the producer
    #[error("Failed to connect to {endpoint} after {attempts} attempt(s): {message}")]
    Connect {
        /// Endpoint description
        endpoint: String,
        /// Number of attempts made
        attempts: u32,
        /// Description of the last failure
        message: String,
    },

    /// Receiving from the channel failed
    #[error("Read error: {message}")]
    Read {
        /// Description of the read failure
        message: String,
    },

    /// Sending on the channel failed
    #[error("Write error: {message}")]
    Write {
        /// Description of the write failure
        message: String,
    },

    /// A received line is not a trigger message
    #[error("Malformed trigger message '{line}'")]
    MalformedMessage {
        /// The offending line
        line: String,
    },

    /// A spawned task panicked or was cancelled before reporting
    #[error("{role} task failed: {message}")]
    TaskFailed {
        /// Which task failed
        role: String,
        /// Join error description
        message: String,
    },
}

impl TriggerError {
    /// Create a Bind error
    pub fn bind(endpoint: impl ToString, error: impl ToString) -> Self {
        TriggerError::Bind {
            endpoint: endpoint.to_string(),
            message: error.to_string(),
        }
    }

    /// Create an Accept error
    pub fn accept(endpoint: impl ToString, error: impl ToString) -> Self {
        TriggerError::Accept {
            endpoint: endpoint.to_string(),
            message: error.to_string(),
        }
    }

    /// Create a Connect error
    pub fn connect(endpoint: impl ToString, attempts: u32, error: impl ToString) -> Self {
        TriggerError::Connect {
            endpoint: endpoint.to_string(),
            attempts,
            message: error.to_string(),
        }
    }

    /// Create a Read error
    pub fn read(error: impl ToString) -> Self {
        TriggerError::Read {
            message: error.to_string(),
        }
    }

    /// Create a Write error
    pub fn write(error: impl ToString) -> Self {
        TriggerError::Write {
            message: error.to_string(),
        }
    }

    /// Create a TaskFailed error
    pub fn task_failed(role: impl ToString, error: impl ToString) -> Self {
        TriggerError::TaskFailed {
            role: role.to_string(),
            message: error.to_string(),
        }
    }
}
