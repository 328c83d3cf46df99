//! Producer/consumer orchestration
//!
//! Opens the two demonstration accounts, starts the producer, waits the
//! startup delay so the producer can begin listening, starts the consumer, and
//! waits for both.
//!
//! # Architecture
//!
//! ```text
//! run_pipeline
//!     ├── producer task ── JoinSet of sender tasks ──▶ trigger channel
//!     └── consumer task ◀── trigger channel
//!             └── Workload (blocking pool) ──▶ Ledger ──▶ Account1 / Account2
//! ```
//!
//! Both tasks belong to one `JoinSet`. Their failures come back as values and
//! are collected in the [`PipelineReport`]; nothing propagates further.

use crate::core::{Bank, Ledger, Workload, WorkloadReport};
use crate::io::{
    run_consumer, run_producer, ConnectPolicy, ConsumerContext, ConsumerReport, ProducerConfig,
    Transport,
};
use crate::types::{AccountSnapshot, TriggerError};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Name of the account deposits go into
pub const PRIMARY_ACCOUNT: &str = "Account1";

/// Name of the account withdrawals come from
pub const SECONDARY_ACCOUNT: &str = "Account2";

/// Default loopback port for the TCP transport
pub const DEFAULT_PORT: u16 = 7878;

/// Configuration of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Trigger channel transport
    pub transport: Transport,
    /// Number of trigger messages (and sender tasks)
    pub message_count: u32,
    /// Starting balance of both accounts
    pub initial_balance: i64,
    /// Pause between a transfer's two lock acquisitions
    pub hold_delay: Duration,
    /// Pause each sender takes after writing
    pub send_delay: Duration,
    /// Head start given to the producer before the consumer starts
    pub startup_delay: Duration,
    /// How the consumer waits for the producer's endpoint
    pub connect: ConnectPolicy,
    /// Runtime worker threads
    pub worker_threads: usize,
    /// Amounts used per trigger message
    pub workload: Workload,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Tcp(SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT))),
            message_count: 5,
            initial_balance: 1000,
            hold_delay: Duration::from_millis(100),
            send_delay: Duration::from_millis(1000),
            startup_delay: Duration::from_millis(500),
            connect: ConnectPolicy::default(),
            worker_threads: num_cpus::get(),
            workload: Workload::default(),
        }
    }
}

impl PipelineConfig {
    /// Replace invalid settings with their defaults
    ///
    /// Zero worker threads and zero connect attempts are not usable; each one
    /// found is logged as a warning and reset.
    pub fn validated(mut self) -> Self {
        let default = Self::default();

        if self.worker_threads == 0 {
            warn!(
                "Invalid worker_threads ({}), using default ({})",
                self.worker_threads, default.worker_threads
            );
            self.worker_threads = default.worker_threads;
        }

        if self.connect.attempts == 0 {
            warn!(
                "Invalid connect attempts ({}), using default ({})",
                self.connect.attempts, default.connect.attempts
            );
            self.connect.attempts = default.connect.attempts;
        }

        self
    }

    fn producer_config(&self) -> ProducerConfig {
        ProducerConfig {
            message_count: self.message_count,
            send_delay: self.send_delay,
        }
    }
}

/// Which task of the pipeline an outcome belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRole {
    Producer,
    Consumer,
}

impl fmt::Display for TaskRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskRole::Producer => f.write_str("producer"),
            TaskRole::Consumer => f.write_str("consumer"),
        }
    }
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Messages the producer wrote
    pub messages_sent: usize,
    /// Well-formed messages the consumer received
    pub messages_received: usize,
    /// Lines the consumer skipped
    pub malformed_messages: usize,
    /// Workload outcomes across all messages
    pub workload: WorkloadReport,
    /// Tasks that stopped on a transport failure
    pub failures: Vec<(TaskRole, TriggerError)>,
    /// Balances after both tasks finished
    pub balances: Vec<AccountSnapshot>,
}

impl PipelineReport {
    /// True when neither task failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_consumer(&mut self, report: ConsumerReport) {
        self.messages_received = report.messages_received;
        self.malformed_messages = report.malformed;
        self.workload = report.workload;
    }
}

enum TaskOutcome {
    Produced(Result<usize, TriggerError>),
    Consumed(Result<ConsumerReport, TriggerError>),
}

/// Run producer and consumer to completion
///
/// Opens [`PRIMARY_ACCOUNT`] and [`SECONDARY_ACCOUNT`] in `bank` with the
/// configured initial balance. Waits for both tasks with no timeout: if a task
/// never finishes, neither does this future.
pub async fn run_pipeline(config: &PipelineConfig, bank: Arc<Bank>) -> PipelineReport {
    let primary = bank.open(PRIMARY_ACCOUNT, config.initial_balance);
    let secondary = bank.open(SECONDARY_ACCOUNT, config.initial_balance);
    let context = ConsumerContext {
        ledger: Ledger::new(config.hold_delay),
        primary,
        secondary,
        workload: config.workload,
    };

    let mut tasks = JoinSet::new();
    let mut pending = vec![TaskRole::Producer, TaskRole::Consumer];

    let (transport, producer_config) = (config.transport.clone(), config.producer_config());
    tasks.spawn(async move {
        TaskOutcome::Produced(run_producer(transport, producer_config).await)
    });

    tokio::time::sleep(config.startup_delay).await;

    let (transport, policy) = (config.transport.clone(), config.connect);
    tasks.spawn(async move {
        TaskOutcome::Consumed(run_consumer(transport, policy, context).await)
    });

    let mut report = PipelineReport::default();
    let mut join_errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(TaskOutcome::Produced(outcome)) => {
                pending.retain(|role| *role != TaskRole::Producer);
                match outcome {
                    Ok(sent) => report.messages_sent = sent,
                    Err(e) => report.failures.push((TaskRole::Producer, e)),
                }
            }
            Ok(TaskOutcome::Consumed(outcome)) => {
                pending.retain(|role| *role != TaskRole::Consumer);
                match outcome {
                    Ok(consumer) => report.record_consumer(consumer),
                    Err(e) => report.failures.push((TaskRole::Consumer, e)),
                }
            }
            Err(e) => join_errors.push(e.to_string()),
        }
    }

    // A task that panicked never reported its role; it is one of those still pending
    for (role, message) in pending.into_iter().zip(join_errors) {
        error!(role = %role, error = %message, "task panicked");
        report
            .failures
            .push((role, TriggerError::task_failed(role, message)));
    }

    report.balances = bank.snapshots();
    info!(
        sent = report.messages_sent,
        received = report.messages_received,
        committed = report.workload.committed,
        rejected = report.workload.rejected,
        failures = report.failures.len(),
        "pipeline finished"
    );
    report
}

/// Run the pipeline on a dedicated multi-threaded runtime
///
/// # Returns
///
/// * `Ok(PipelineReport)` - Both tasks finished (possibly with failures)
/// * `Err(String)` - The runtime could not be created
pub fn run(config: &PipelineConfig) -> Result<PipelineReport, String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads.max(1))
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

    let bank = Arc::new(Bank::new());
    Ok(runtime.block_on(run_pipeline(config, bank)))
}
