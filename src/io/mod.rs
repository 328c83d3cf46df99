//! I/O module
//!
//! Handles the trigger channel and the final output.
//!
//! # Components
//!
//! - `transport` - Memory, TCP and Unix socket transports (listen/accept/connect)
//! - `framing` - One line per trigger message, read back as a lazy stream
//! - `producer` - Fans trigger messages out over concurrent sender tasks
//! - `consumer` - Drains the channel and runs the ledger workload per message
//! - `balances_csv` - CSV serialization of final balances

pub mod balances_csv;
pub mod consumer;
pub mod framing;
pub mod producer;
pub mod transport;

pub use balances_csv::write_balances_csv;
pub use consumer::{run_consumer, ConsumerContext, ConsumerReport};
pub use producer::{run_producer, ProducerConfig};
pub use transport::{ConnectPolicy, MemoryChannel, Transport};
