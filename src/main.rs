//! Contended Ledger CLI
//!
//! Runs the trigger pipeline or the contention probe.
//!
//! # Usage
//!
//! ```bash
//! cargo run > balances.csv
//! cargo run -- run --transport unix --messages 10 > balances.csv
//! cargo run -- run --transport memory --hold-delay-ms 0 --send-delay-ms 10
//! cargo run -- contend --strategy naive --pairs 4
//! RUST_LOG=debug cargo run -- contend --strategy ordered
//! ```
//!
//! `run` prints the final balances of both accounts to stdout as CSV.
//! `contend` prints what the probe observed. Logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success (a deadlock found by `contend` is a result, not an error)
//! - 1: Error (runtime creation failed, producer or consumer failed, output not writable)

use contended_ledger::cli::{self, Command};
use contended_ledger::contention::{run_contention, ContentionReport};
use contended_ledger::io::write_balances_csv;
use contended_ledger::logging::init_logging;
use contended_ledger::orchestrator::{self, PipelineReport};
use std::io::Write;
use std::process;

fn main() {
    // Parse command-line arguments using clap
    let args = cli::parse_args();
    init_logging(&args.log_level);

    let result = match args.selected_command() {
        Command::Run(run) => run
            .to_pipeline_config()
            .and_then(|config| orchestrator::run(&config))
            .and_then(|report| print_pipeline_report(&report)),
        Command::Contend(contend) => {
            let report = run_contention(&contend.to_contention_config());
            print_contention_report(&report)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn print_pipeline_report(report: &PipelineReport) -> Result<(), String> {
    let mut output = std::io::stdout();
    write_balances_csv(&report.balances, &mut output)?;

    if report.is_success() {
        return Ok(());
    }

    let failures: Vec<String> = report
        .failures
        .iter()
        .map(|(role, e)| format!("{}: {}", role, e))
        .collect();
    Err(failures.join("; "))
}

fn print_contention_report(report: &ContentionReport) -> Result<(), String> {
    let mut output = std::io::stdout().lock();
    let total_after = report
        .total_after
        .map_or_else(|| "unknown".to_string(), |total| total.to_string());

    writeln!(
        output,
        "strategy={} transfers={} completed={} stalled={} deadlocked={} total_before={} total_after={} elapsed_ms={}",
        report.strategy,
        report.transfers,
        report.completed,
        report.stalled,
        report.deadlocked(),
        report.total_before,
        total_after,
        report.elapsed.as_millis()
    )
    .map_err(|e| format!("Failed to write report: {}", e))
}
