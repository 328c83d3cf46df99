//! Opposite-direction contention probe
//!
//! Runs `pairs` pairs of concurrent transfers, each pair moving money in both
//! directions between two accounts at once, and counts how many transfers
//! finish before a deadline. With the ordered strategy every transfer
//! finishes; with the naive strategy and a non-zero hold delay, the pairs
//! deadlock and stay stalled.
//!
//! The probe never tries to break a deadlock. Stalled transfer threads are
//! detached and stay blocked for the rest of the process, together with the
//! account locks they hold, so balances are only read back when nothing
//! stalled.

use crate::core::Bank;
use crate::strategy::{create_strategy, StrategyType, TransferStrategy};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Probe settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentionConfig {
    /// Lock acquisition strategy under test
    pub strategy: StrategyType,
    /// Number of opposite-direction transfer pairs
    pub pairs: usize,
    /// Number of accounts the pairs are spread over (at least 2)
    pub accounts: usize,
    /// Starting balance of every account
    pub initial_balance: i64,
    /// Amount of every transfer
    pub amount: u64,
    /// Pause between a transfer's two lock acquisitions
    pub hold_delay: Duration,
    /// How long to wait for all transfers
    pub deadline: Duration,
}

impl Default for ContentionConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyType::Ordered,
            pairs: 8,
            accounts: 2,
            initial_balance: 1000,
            amount: 10,
            hold_delay: Duration::from_millis(100),
            deadline: Duration::from_secs(5),
        }
    }
}

impl ContentionConfig {
    /// Replace invalid settings with their defaults
    pub fn validated(mut self) -> Self {
        let default = Self::default();

        if self.pairs == 0 {
            warn!(
                "Invalid pairs ({}), using default ({})",
                self.pairs, default.pairs
            );
            self.pairs = default.pairs;
        }

        if self.accounts < 2 {
            warn!(
                "Invalid accounts ({}), using default ({})",
                self.accounts, default.accounts
            );
            self.accounts = default.accounts;
        }

        self
    }
}

/// What the probe observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentionReport {
    pub strategy: StrategyType,
    /// Transfers started (two per pair)
    pub transfers: usize,
    /// Transfers that returned before the deadline, committed or rejected
    pub completed: usize,
    /// Transfers still blocked at the deadline
    pub stalled: usize,
    /// Sum of balances before the run
    pub total_before: i128,
    /// Sum of balances after the run; `None` when transfers stalled
    pub total_after: Option<i128>,
    /// Time spent waiting
    pub elapsed: Duration,
}

impl ContentionReport {
    /// True when at least one transfer never returned
    pub fn deadlocked(&self) -> bool {
        self.stalled > 0
    }
}

/// Run the probe
///
/// Blocks the calling thread for at most `config.deadline` (plus thread
/// start-up). Invalid settings are replaced as in [`ContentionConfig::validated`].
pub fn run_contention(config: &ContentionConfig) -> ContentionReport {
    let config = config.validated();
    let bank = Bank::new();
    let accounts: Vec<_> = (0..config.accounts)
        .map(|i| bank.open(format!("Contended{}", i + 1), config.initial_balance))
        .collect();
    let total_before = bank.total_balance();

    let strategy: Arc<dyn TransferStrategy> =
        Arc::from(create_strategy(config.strategy, config.hold_delay));
    let transfers = config.pairs * 2;
    let start_line = Arc::new(Barrier::new(transfers));
    let (done_tx, done_rx) = mpsc::channel();

    info!(
        strategy = %config.strategy,
        pairs = config.pairs,
        accounts = config.accounts,
        "starting contention probe"
    );

    for pair in 0..config.pairs {
        let a = Arc::clone(&accounts[pair % config.accounts]);
        let b = Arc::clone(&accounts[(pair + 1) % config.accounts]);
        for (from, to) in [(Arc::clone(&a), Arc::clone(&b)), (b, a)] {
            let strategy = Arc::clone(&strategy);
            let start_line = Arc::clone(&start_line);
            let done_tx = done_tx.clone();
            let amount = config.amount;
            // Detached on purpose: a deadlocked transfer is never joined
            thread::spawn(move || {
                start_line.wait();
                let _ = strategy.transfer(&from, &to, amount);
                let _ = done_tx.send(());
            });
        }
    }
    drop(done_tx);

    let started = Instant::now();
    let mut completed = 0;
    while completed < transfers {
        let remaining = config.deadline.saturating_sub(started.elapsed());
        match done_rx.recv_timeout(remaining) {
            Ok(()) => completed += 1,
            Err(_) => break,
        }
    }
    let elapsed = started.elapsed();
    let stalled = transfers - completed;

    let total_after = (stalled == 0).then(|| bank.total_balance());
    if stalled > 0 {
        warn!(
            strategy = %config.strategy,
            stalled,
            elapsed_ms = elapsed.as_millis() as u64,
            "transfers stalled: deadlock"
        );
    } else {
        info!(
            strategy = %config.strategy,
            completed,
            elapsed_ms = elapsed.as_millis() as u64,
            "all transfers completed"
        );
    }

    ContentionReport {
        strategy: config.strategy,
        transfers,
        completed,
        stalled,
        total_before,
        total_after,
        elapsed,
    }
}
