//! Trigger message producer
//!
//! The producer listens on the transport, blocks until a consumer attaches,
//! then fans the messages out over concurrent sender tasks. Each sender holds
//! the channel's write lock for exactly one full line, so concurrent sends never
//! interleave, but the order in which messages reach the consumer is whatever
//! order the senders win the lock in.
//!
//! # Task Group
//!
//! Senders live in a `JoinSet` owned by the producer. The producer joins every
//! sender before closing the channel, and the first sender failure is returned
//! once all of them have finished.

use super::framing::{message_sink, MessageSink};
use super::transport::Transport;
use crate::types::{TriggerError, TriggerMessage};
use futures::SinkExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Producer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerConfig {
    /// Number of messages, one sender task each, numbered from 1
    pub message_count: u32,
    /// Pause each sender takes after its write, simulating work
    pub send_delay: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            message_count: 5,
            send_delay: Duration::from_millis(1000),
        }
    }
}

/// Run the producer to completion
///
/// # Returns
///
/// * `Ok(sent)` - Number of messages written before the channel was closed
/// * `Err(TriggerError)` - The transport failed; the error has already been
///   logged
pub async fn run_producer(
    transport: Transport,
    config: ProducerConfig,
) -> Result<usize, TriggerError> {
    let result = produce(&transport, config).await;
    if let Err(e) = &result {
        error!(endpoint = %transport.endpoint(), error = %e, "[producer] stopped");
    }
    result
}

async fn produce(transport: &Transport, config: ProducerConfig) -> Result<usize, TriggerError> {
    let listener = transport.listen().await?;
    info!(endpoint = %transport.endpoint(), "[producer] waiting for connection");
    let writer = listener.accept().await?;
    info!(endpoint = %transport.endpoint(), "[producer] connected to consumer");

    let sink = Arc::new(Mutex::new(message_sink(writer)));
    let mut senders = JoinSet::new();
    for sequence in 1..=config.message_count {
        senders.spawn(send_message(
            Arc::clone(&sink),
            TriggerMessage::new(sequence),
            config.send_delay,
        ));
    }

    let (sent, first_error) = join_senders(&mut senders).await;

    // Closing shuts the write half down, which the consumer sees as end-of-stream
    let closed = {
        let mut sink = sink.lock().await;
        SinkExt::<String>::close(&mut *sink)
            .await
            .map_err(TriggerError::write)
    };
    if let Some(e) = first_error {
        return Err(e);
    }
    closed?;

    info!(sent, "[producer] all messages sent, channel closed");
    Ok(sent)
}

/// Join every sender, counting successes and keeping the first failure
async fn join_senders(
    senders: &mut JoinSet<Result<(), TriggerError>>,
) -> (usize, Option<TriggerError>) {
    let mut sent = 0;
    let mut first_error = None;
    while let Some(joined) = senders.join_next().await {
        match joined {
            Ok(Ok(())) => sent += 1,
            Ok(Err(e)) => {
                error!(error = %e, "[producer] sender failed");
                first_error.get_or_insert(e);
            }
            Err(e) => {
                error!(error = %e, "[producer] sender panicked");
                first_error.get_or_insert(TriggerError::task_failed("sender", e));
            }
        }
    }
    (sent, first_error)
}

/// One sender: a single scoped write of one whole message
async fn send_message(
    sink: Arc<Mutex<MessageSink>>,
    message: TriggerMessage,
    send_delay: Duration,
) -> Result<(), TriggerError> {
    {
        let mut sink = sink.lock().await;
        info!(sequence = message.sequence, "[producer] sending {}", message);
        sink.send(message.to_string())
            .await
            .map_err(TriggerError::write)?;
    }
    tokio::time::sleep(send_delay).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::framing::message_stream;
    use crate::io::transport::ConnectPolicy;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_producer_sends_every_message_once() {
        let transport = Transport::memory();
        let config = ProducerConfig {
            message_count: 5,
            send_delay: Duration::from_millis(5),
        };

        let producer = tokio::spawn(run_producer(transport.clone(), config));
        let reader = transport.connect(ConnectPolicy::default()).await.unwrap();
        let received: Vec<TriggerMessage> = message_stream(reader)
            .map(|message| message.unwrap())
            .collect()
            .await;

        assert_eq!(producer.await.unwrap(), Ok(5));
        let mut sequences: Vec<u32> = received.iter().map(|m| m.sequence).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_producer_with_no_messages_closes_channel() {
        let transport = Transport::memory();
        let config = ProducerConfig {
            message_count: 0,
            send_delay: Duration::ZERO,
        };

        let producer = tokio::spawn(run_producer(transport.clone(), config));
        let reader = transport.connect(ConnectPolicy::default()).await.unwrap();
        let received: Vec<_> = message_stream(reader).collect().await;

        assert_eq!(producer.await.unwrap(), Ok(0));
        assert!(received.is_empty());
    }

    fn panicking_send() -> Result<(), TriggerError> {
        panic!("sender blew up")
    }

    #[tokio::test]
    async fn test_join_senders_reports_panicked_sender() {
        let mut senders = JoinSet::new();
        senders.spawn(async { Ok(()) });
        senders.spawn(async { panicking_send() });
        senders.spawn(async { Ok(()) });

        let (sent, first_error) = join_senders(&mut senders).await;

        assert_eq!(sent, 2);
        assert!(matches!(
            first_error,
            Some(TriggerError::TaskFailed { ref role, .. }) if role == "sender"
        ));
    }

    #[tokio::test]
    async fn test_producer_reports_bind_failure() {
        // Occupy the port so the producer cannot listen on it
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let transport = Transport::Tcp(occupied.local_addr().unwrap());

        let result = run_producer(transport, ProducerConfig::default()).await;

        assert!(matches!(result, Err(TriggerError::Bind { .. })));
    }
}
