//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account, its identity and snapshots
//! - `message`: Trigger messages carried on the trigger channel
//! - `error`: Error types for the ledger and the trigger channel

pub mod account;
pub mod error;
pub mod message;

pub use account::{Account, AccountId, AccountSnapshot};
pub use error::{LedgerError, TriggerError};
pub use message::TriggerMessage;
