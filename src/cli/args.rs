use crate::contention::ContentionConfig;
use crate::core::Workload;
use crate::io::{ConnectPolicy, Transport};
use crate::orchestrator::{PipelineConfig, DEFAULT_PORT};
use crate::strategy::StrategyType;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MESSAGES: u32 = 5;
const DEFAULT_INITIAL_BALANCE: i64 = 1000;
const DEFAULT_HOLD_DELAY_MS: u64 = 100;
const DEFAULT_SEND_DELAY_MS: u64 = 1000;
const DEFAULT_STARTUP_DELAY_MS: u64 = 500;
const DEFAULT_CONNECT_ATTEMPTS: u32 = 50;
const DEFAULT_CONNECT_BACKOFF_MS: u64 = 100;

fn default_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
}

/// Concurrent ledger with a message-triggered transfer workload
#[derive(Parser, Debug)]
#[command(name = "contended-ledger")]
#[command(about = "Concurrent account transfers driven by trigger messages", long_about = None)]
pub struct CliArgs {
    /// Default log level when RUST_LOG is not set
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "info",
        global = true,
        help = "Log level used when RUST_LOG is unset (error, warn, info, debug, trace)"
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands; `run` is used when none is given
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the producer/consumer pipeline and print final balances as CSV
    Run(RunArgs),
    /// Run opposite-direction transfer pairs and report whether they deadlock
    Contend(ContendArgs),
}

/// Available trigger channel transports
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransportType {
    Memory,
    Tcp,
    Unix,
}

/// Options of the `run` command
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Trigger channel transport
    #[arg(
        long = "transport",
        value_name = "TRANSPORT",
        default_value = "tcp",
        help = "Trigger channel: 'memory', 'tcp' (loopback) or 'unix' (domain socket)"
    )]
    pub transport: TransportType,

    /// Address for the tcp transport
    #[arg(long = "address", value_name = "ADDR", default_value_t = default_address())]
    pub address: SocketAddr,

    /// Socket path for the unix transport
    #[arg(
        long = "socket-path",
        value_name = "PATH",
        help = "Socket path for the unix transport (default: <temp dir>/contended-ledger.sock)"
    )]
    pub socket_path: Option<PathBuf>,

    /// Number of trigger messages
    #[arg(long = "messages", value_name = "COUNT", default_value_t = DEFAULT_MESSAGES)]
    pub messages: u32,

    /// Starting balance of both accounts
    #[arg(
        long = "initial-balance",
        value_name = "AMOUNT",
        default_value_t = DEFAULT_INITIAL_BALANCE,
        allow_negative_numbers = true
    )]
    pub initial_balance: i64,

    /// Pause between a transfer's two lock acquisitions
    #[arg(long = "hold-delay-ms", value_name = "MS", default_value_t = DEFAULT_HOLD_DELAY_MS)]
    pub hold_delay_ms: u64,

    /// Pause each sender takes after writing
    #[arg(long = "send-delay-ms", value_name = "MS", default_value_t = DEFAULT_SEND_DELAY_MS)]
    pub send_delay_ms: u64,

    /// Head start of the producer before the consumer starts
    #[arg(long = "startup-delay-ms", value_name = "MS", default_value_t = DEFAULT_STARTUP_DELAY_MS)]
    pub startup_delay_ms: u64,

    /// Consumer connection attempts
    #[arg(
        long = "connect-attempts",
        value_name = "COUNT",
        default_value_t = DEFAULT_CONNECT_ATTEMPTS
    )]
    pub connect_attempts: u32,

    /// Pause between consumer connection attempts
    #[arg(
        long = "connect-backoff-ms",
        value_name = "MS",
        default_value_t = DEFAULT_CONNECT_BACKOFF_MS
    )]
    pub connect_backoff_ms: u64,

    /// Runtime worker threads
    #[arg(
        long = "worker-threads",
        value_name = "COUNT",
        help = "Runtime worker threads (default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,
}

/// Options of the `contend` command
#[derive(Args, Debug, Clone)]
pub struct ContendArgs {
    /// Lock acquisition strategy under test
    #[arg(long = "strategy", value_name = "STRATEGY", default_value = "ordered")]
    pub strategy: StrategyType,

    /// Opposite-direction transfer pairs
    #[arg(long = "pairs", value_name = "COUNT", default_value_t = 8)]
    pub pairs: usize,

    /// Accounts the pairs are spread over
    #[arg(long = "accounts", value_name = "COUNT", default_value_t = 2)]
    pub accounts: usize,

    /// Starting balance of every account
    #[arg(long = "initial-balance", value_name = "AMOUNT", default_value_t = 1000)]
    pub initial_balance: i64,

    /// Amount of every transfer
    #[arg(long = "amount", value_name = "AMOUNT", default_value_t = 10)]
    pub amount: u64,

    /// Pause between a transfer's two lock acquisitions
    #[arg(long = "hold-delay-ms", value_name = "MS", default_value_t = 100)]
    pub hold_delay_ms: u64,

    /// How long to wait before declaring stalled transfers deadlocked
    #[arg(long = "deadline-ms", value_name = "MS", default_value_t = 5000)]
    pub deadline_ms: u64,
}

impl CliArgs {
    /// The selected command, falling back to `run` with default options
    pub fn selected_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Run(RunArgs::default()))
    }
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            transport: TransportType::Tcp,
            address: default_address(),
            socket_path: None,
            messages: DEFAULT_MESSAGES,
            initial_balance: DEFAULT_INITIAL_BALANCE,
            hold_delay_ms: DEFAULT_HOLD_DELAY_MS,
            send_delay_ms: DEFAULT_SEND_DELAY_MS,
            startup_delay_ms: DEFAULT_STARTUP_DELAY_MS,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_backoff_ms: DEFAULT_CONNECT_BACKOFF_MS,
            worker_threads: None,
        }
    }
}

impl RunArgs {
    /// Create a PipelineConfig from CLI arguments
    ///
    /// # Returns
    ///
    /// * `Ok(PipelineConfig)` - Validated configuration
    /// * `Err(String)` - If the transport is not available on this platform
    pub fn to_pipeline_config(&self) -> Result<PipelineConfig, String> {
        let transport = match self.transport {
            TransportType::Memory => Transport::memory(),
            TransportType::Tcp => Transport::Tcp(self.address),
            #[cfg(unix)]
            TransportType::Unix => Transport::Unix(
                self.socket_path
                    .clone()
                    .unwrap_or_else(|| std::env::temp_dir().join("contended-ledger.sock")),
            ),
            #[cfg(not(unix))]
            TransportType::Unix => {
                return Err("The unix transport is not available on this platform".to_string())
            }
        };

        let config = PipelineConfig {
            transport,
            message_count: self.messages,
            initial_balance: self.initial_balance,
            hold_delay: Duration::from_millis(self.hold_delay_ms),
            send_delay: Duration::from_millis(self.send_delay_ms),
            startup_delay: Duration::from_millis(self.startup_delay_ms),
            connect: ConnectPolicy {
                attempts: self.connect_attempts,
                backoff: Duration::from_millis(self.connect_backoff_ms),
            },
            worker_threads: self.worker_threads.unwrap_or_else(num_cpus::get),
            workload: Workload::default(),
        };

        Ok(config.validated())
    }
}

impl ContendArgs {
    /// Create a ContentionConfig from CLI arguments
    pub fn to_contention_config(&self) -> ContentionConfig {
        ContentionConfig {
            strategy: self.strategy,
            pairs: self.pairs,
            accounts: self.accounts,
            initial_balance: self.initial_balance,
            amount: self.amount,
            hold_delay: Duration::from_millis(self.hold_delay_ms),
            deadline: Duration::from_millis(self.deadline_ms),
        }
        .validated()
    }
}
