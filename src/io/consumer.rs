//! Trigger message consumer
//!
//! The consumer attaches to the producer, then drains the message stream until
//! end-of-stream. Every message triggers one run of the ledger workload.
//!
//! Account locks and the ledger's hold delay block OS threads, so each
//! workload run goes to tokio's blocking pool instead of stalling a runtime
//! worker. Messages are still handled one at a time, in arrival order.

use super::framing::message_stream;
use super::transport::{ConnectPolicy, Transport};
use crate::core::{Ledger, Workload, WorkloadReport};
use crate::types::{Account, TriggerError};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything the consumer needs to run the workload
#[derive(Debug, Clone)]
pub struct ConsumerContext {
    pub ledger: Ledger,
    pub primary: Arc<Account>,
    pub secondary: Arc<Account>,
    pub workload: Workload,
}

impl ConsumerContext {
    fn run_workload(&self) -> WorkloadReport {
        self.workload.run(&self.ledger, &self.primary, &self.secondary)
    }
}

/// What the consumer saw before end-of-stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    /// Well-formed messages received
    pub messages_received: usize,
    /// Lines skipped because they were not trigger messages
    pub malformed: usize,
    /// Outcomes of the workload runs
    pub workload: WorkloadReport,
}

/// Run the consumer to completion
///
/// # Returns
///
/// * `Ok(ConsumerReport)` - The channel reached end-of-stream
/// * `Err(TriggerError)` - Connecting or reading failed; the error has already
///   been logged and the loop stopped
pub async fn run_consumer(
    transport: Transport,
    policy: ConnectPolicy,
    context: ConsumerContext,
) -> Result<ConsumerReport, TriggerError> {
    let result = consume(&transport, policy, context).await;
    if let Err(e) = &result {
        error!(endpoint = %transport.endpoint(), error = %e, "[consumer] stopped");
    }
    result
}

async fn consume(
    transport: &Transport,
    policy: ConnectPolicy,
    context: ConsumerContext,
) -> Result<ConsumerReport, TriggerError> {
    info!(endpoint = %transport.endpoint(), "[consumer] connecting to producer");
    let reader = transport.connect(policy).await?;
    info!(endpoint = %transport.endpoint(), "[consumer] connected to producer");

    let mut messages = message_stream(reader);
    let mut report = ConsumerReport::default();

    while let Some(item) = messages.next().await {
        match item {
            Ok(message) => {
                info!(sequence = message.sequence, "[consumer] received {}", message);
                report.messages_received += 1;

                let context = context.clone();
                let outcome = tokio::task::spawn_blocking(move || context.run_workload())
                    .await
                    .map_err(|e| TriggerError::task_failed("workload", e))?;
                report.workload += outcome;
            }
            Err(TriggerError::MalformedMessage { line }) => {
                warn!(line = %line, "[consumer] skipping malformed message");
                report.malformed += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        received = report.messages_received,
        "[consumer] end of stream"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn context() -> ConsumerContext {
        ConsumerContext {
            ledger: Ledger::default(),
            primary: Arc::new(Account::new("Account1", 1000)),
            secondary: Arc::new(Account::new("Account2", 1000)),
            workload: Workload::default(),
        }
    }

    #[tokio::test]
    async fn test_consumer_runs_workload_per_message() {
        let transport = Transport::memory();
        let context = context();
        let (primary, secondary) = (Arc::clone(&context.primary), Arc::clone(&context.secondary));

        let consumer = tokio::spawn(run_consumer(
            transport.clone(),
            ConnectPolicy::default(),
            context,
        ));
        let mut writer = transport.listen().await.unwrap().accept().await.unwrap();
        writer
            .write_all(b"Message 2\nMessage 1\ngarbage\nMessage 3\n")
            .await
            .unwrap();
        writer.shutdown().await.unwrap();

        let report = consumer.await.unwrap().unwrap();

        assert_eq!(report.messages_received, 3);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.workload.total(), 12);
        assert_eq!(report.workload.rejected, 0);
        assert_eq!(primary.balance(), 1000);
        assert_eq!(secondary.balance(), 1000 + 3 * 50);
    }

    #[tokio::test]
    async fn test_consumer_reports_connect_failure() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let policy = ConnectPolicy {
            attempts: 2,
            backoff: Duration::from_millis(10),
        };

        let result = run_consumer(Transport::Tcp(addr), policy, context()).await;

        assert!(matches!(result, Err(TriggerError::Connect { .. })));
    }
}
