//! End-to-end integration tests
//!
//! These tests run the complete pipeline through the public API:
//! 1. Open the two demonstration accounts
//! 2. Start the producer on a real transport and the consumer against it
//! 3. Run the ledger workload for every trigger message
//! 4. Render final balances as CSV and compare with the expected output
//!
//! They also drive the ledger scenarios directly and run the contention probe
//! once per transfer strategy.

#[cfg(test)]
mod tests {
    use contended_ledger::contention::{run_contention, ContentionConfig};
    use contended_ledger::core::{Bank, Ledger};
    use contended_ledger::io::{write_balances_csv, ConnectPolicy, Transport};
    use contended_ledger::orchestrator::{run_pipeline, PipelineConfig, PipelineReport};
    use contended_ledger::strategy::StrategyType;
    use contended_ledger::types::LedgerError;
    use rstest::rstest;
    use std::net::{SocketAddr, TcpListener};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy)]
    enum TransportType {
        Memory,
        Tcp,
        #[cfg(unix)]
        Unix,
    }

    /// Pick a loopback port nobody is listening on
    fn free_local_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    /// Run the pipeline with short delays over the given transport
    ///
    /// The returned tempdir keeps the unix socket directory alive for the
    /// duration of the run.
    async fn run_fast_pipeline(
        transport_type: TransportType,
        message_count: u32,
    ) -> (PipelineReport, Arc<Bank>) {
        let dir = tempfile::tempdir().unwrap();
        let transport = match transport_type {
            TransportType::Memory => Transport::memory(),
            TransportType::Tcp => Transport::Tcp(free_local_addr()),
            #[cfg(unix)]
            TransportType::Unix => Transport::Unix(dir.path().join("trigger.sock")),
        };

        let config = PipelineConfig {
            transport,
            message_count,
            hold_delay: Duration::from_millis(2),
            send_delay: Duration::from_millis(10),
            startup_delay: Duration::from_millis(50),
            connect: ConnectPolicy {
                attempts: 100,
                backoff: Duration::from_millis(20),
            },
            worker_threads: 2,
            ..PipelineConfig::default()
        };

        let bank = Arc::new(Bank::new());
        let report = run_pipeline(&config, Arc::clone(&bank)).await;
        drop(dir);
        (report, bank)
    }

    /// Drop the generated account ids so output can be compared
    fn strip_ids(csv: &str) -> Vec<String> {
        csv.lines()
            .map(|line| line.splitn(2, ',').nth(1).unwrap_or_default().to_string())
            .collect()
    }

    #[rstest]
    #[case::memory(TransportType::Memory)]
    #[case::tcp(TransportType::Tcp)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pipeline_delivers_every_message(#[case] transport_type: TransportType) {
        let (report, bank) = run_fast_pipeline(transport_type, 5).await;

        assert!(report.is_success(), "failures: {:?}", report.failures);
        assert_eq!(report.messages_sent, 5);
        assert_eq!(report.messages_received, 5);
        assert_eq!(report.malformed_messages, 0);
        // Every workload step commits while balances stay well funded
        assert_eq!(report.workload.committed, 20);
        assert_eq!(report.workload.rejected, 0);
        // Deposits add 100 and withdrawals remove 50 per message
        assert_eq!(bank.total_balance(), 2000 + 5 * 50);
    }

    #[rstest]
    #[case::memory(TransportType::Memory)]
    #[case::tcp(TransportType::Tcp)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pipeline_balances_csv(#[case] transport_type: TransportType) {
        let (report, _bank) = run_fast_pipeline(transport_type, 5).await;

        let mut output = Vec::new();
        write_balances_csv(&report.balances, &mut output).unwrap();
        let actual = String::from_utf8(output).unwrap();

        // Per message: Account1 +100 -200 +100, Account2 -50 +200 -100
        assert_eq!(
            strip_ids(&actual),
            vec!["name,balance", "Account1,1000", "Account2,1250"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pipeline_with_zero_messages() {
        let (report, bank) = run_fast_pipeline(TransportType::Memory, 0).await;

        assert!(report.is_success(), "failures: {:?}", report.failures);
        assert_eq!(report.messages_sent, 0);
        assert_eq!(report.messages_received, 0);
        assert_eq!(bank.total_balance(), 2000);
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pipeline_over_unix_socket() {
        let (report, bank) = run_fast_pipeline(TransportType::Unix, 3).await;

        assert!(report.is_success(), "failures: {:?}", report.failures);
        assert_eq!(report.messages_received, 3);
        assert_eq!(bank.total_balance(), 2000 + 3 * 50);
    }

    // Ledger scenarios
    #[test]
    fn test_deposit_scenario() {
        let bank = Bank::new();
        let ledger = Ledger::new(Duration::ZERO);
        let account = bank.open("Account1", 1000);

        assert_eq!(ledger.deposit(&account, 100), Ok(1100));
        assert_eq!(account.balance(), 1100);
    }

    #[test]
    fn test_withdraw_insufficient_scenario() {
        let bank = Bank::new();
        let ledger = Ledger::new(Duration::ZERO);
        let account = bank.open("Account2", 30);

        let result = ledger.withdraw(&account, 50);

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(account.balance(), 30);
    }

    #[rstest]
    #[case::naive(StrategyType::Naive)]
    #[case::ordered(StrategyType::Ordered)]
    fn test_transfer_insufficient_scenario(#[case] kind: StrategyType) {
        let bank = Bank::new();
        let ledger = Ledger::new(Duration::ZERO);
        let from = bank.open("Account1", 100);
        let to = bank.open("Account2", 1000);

        let result = ledger.transfer_with(kind, &from, &to, 200);

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(from.balance(), 100);
        assert_eq!(to.balance(), 1000);
    }

    #[test]
    fn test_safe_transfer_scenario() {
        let bank = Bank::new();
        let ledger = Ledger::new(Duration::from_millis(5));
        let account1 = bank.open("Account1", 1000);
        let account2 = bank.open("Account2", 1000);

        let receipt = ledger.safe_transfer(&account2, &account1, 50).unwrap();

        assert_eq!(receipt.from_balance, 950);
        assert_eq!(receipt.to_balance, 1050);
        assert_eq!(account1.balance(), 1050);
        assert_eq!(account2.balance(), 950);
    }

    // Contention probe
    #[rstest]
    #[case::ordered_completes(StrategyType::Ordered, false)]
    #[case::naive_deadlocks(StrategyType::Naive, true)]
    fn test_contention_by_strategy(#[case] strategy: StrategyType, #[case] deadlocks: bool) {
        let config = ContentionConfig {
            strategy,
            pairs: 4,
            hold_delay: Duration::from_millis(150),
            deadline: Duration::from_secs(if deadlocks { 3 } else { 10 }),
            ..ContentionConfig::default()
        };

        let report = run_contention(&config);

        assert_eq!(report.deadlocked(), deadlocks, "{:?}", report);
        if !deadlocks {
            assert_eq!(report.completed, 8);
            assert_eq!(report.total_after, Some(report.total_before));
        }
    }
}
