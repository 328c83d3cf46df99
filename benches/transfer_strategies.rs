//! Benchmark suite for comparing transfer strategies
//!
//! Measures the lock acquisition overhead of the naive and ordered strategies
//! using the divan benchmarking framework. The hold delay is zero so only
//! locking and settlement are timed.
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//! ```

use contended_ledger::core::Bank;
use contended_ledger::strategy::{create_strategy, StrategyType, TransferStrategy};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    divan::main();
}

/// Single-threaded back-and-forth transfers between two accounts
#[divan::bench(args = [StrategyType::Naive, StrategyType::Ordered])]
fn uncontended_transfer(bencher: divan::Bencher, kind: StrategyType) {
    let bank = Bank::new();
    let a = bank.open("A", 1_000_000);
    let b = bank.open("B", 1_000_000);
    let strategy = create_strategy(kind, Duration::ZERO);

    bencher.bench_local(|| {
        let _ = strategy.transfer(&a, &b, 1);
        let _ = strategy.transfer(&b, &a, 1);
    });
}

/// Four threads transferring in both directions over a ring of accounts
///
/// Only the ordered strategy is measured: the naive one can deadlock here.
#[divan::bench(sample_count = 20)]
fn contended_ordered_transfers(bencher: divan::Bencher) {
    let bank = Bank::new();
    let accounts: Vec<_> = (0..4)
        .map(|i| bank.open(format!("Ring{}", i), 1_000_000))
        .collect();
    let strategy: Arc<dyn TransferStrategy> =
        Arc::from(create_strategy(StrategyType::Ordered, Duration::ZERO));

    bencher.bench_local(|| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let from = Arc::clone(&accounts[i]);
                let to = Arc::clone(&accounts[(i + 1) % 4]);
                let strategy = Arc::clone(&strategy);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let _ = strategy.transfer(&from, &to, 1);
                        let _ = strategy.transfer(&to, &from, 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            let _ = handle.join();
        }
    });
}
