//! Trigger channel transports
//!
//! The producer plays the server role (`listen` then `accept` one consumer) and
//! only writes; the consumer plays the client role (`connect`) and only reads.
//! Three transports are provided:
//!
//! - `Memory` - an in-process `tokio::io::duplex` pipe
//! - `Tcp` - a loopback TCP connection
//! - `Unix` - a Unix domain socket, the local named-channel transport
//!
//! All of them deliver one connection's bytes reliably and in order, and report
//! end-of-stream to the reader once the writer shuts down.

use crate::types::TriggerError;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;
#[cfg(unix)]
use std::path::{Path, PathBuf};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

/// Read half of the channel as seen by the consumer
pub type ChannelReader = Box<dyn AsyncRead + Send + Unpin>;

/// Write half of the channel as seen by the producer
pub type ChannelWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Buffer size of the in-memory pipe
const MEMORY_PIPE_CAPACITY: usize = 4096;

/// How a consumer waits for the producer's endpoint to appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    /// Maximum number of connection attempts (at least one is always made)
    pub attempts: u32,
    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 50,
            backoff: Duration::from_millis(100),
        }
    }
}

/// Concrete transport of the trigger channel
#[derive(Debug, Clone)]
pub enum Transport {
    /// In-process pipe
    Memory(MemoryChannel),
    /// Loopback TCP on a fixed address
    Tcp(SocketAddr),
    /// Unix domain socket at a filesystem path
    #[cfg(unix)]
    Unix(PathBuf),
}

impl Transport {
    /// A fresh in-memory transport
    pub fn memory() -> Self {
        Transport::Memory(MemoryChannel::new())
    }

    /// Human-readable endpoint, used in logs and errors
    pub fn endpoint(&self) -> String {
        match self {
            Transport::Memory(_) => "memory".to_string(),
            Transport::Tcp(addr) => addr.to_string(),
            #[cfg(unix)]
            Transport::Unix(path) => path.display().to_string(),
        }
    }

    /// Server role: create the endpoint consumers connect to
    pub async fn listen(&self) -> Result<Listener, TriggerError> {
        match self {
            Transport::Memory(channel) => Ok(Listener::Memory(channel.clone())),
            Transport::Tcp(addr) => TcpListener::bind(addr)
                .await
                .map(Listener::Tcp)
                .map_err(|e| TriggerError::bind(addr, e)),
            #[cfg(unix)]
            Transport::Unix(path) => {
                remove_stale_socket(path).map_err(|e| TriggerError::bind(path.display(), e))?;
                let listener =
                    UnixListener::bind(path).map_err(|e| TriggerError::bind(path.display(), e))?;
                Ok(Listener::Unix(listener, SocketFile(path.clone())))
            }
        }
    }

    /// Client role: attach to the producer's endpoint
    ///
    /// Retries according to `policy` while the endpoint does not exist yet.
    pub async fn connect(&self, policy: ConnectPolicy) -> Result<ChannelReader, TriggerError> {
        let endpoint = self.endpoint();
        match self {
            Transport::Memory(channel) => channel.connect().await,
            Transport::Tcp(addr) => {
                let stream = retry_connect(&endpoint, policy, || TcpStream::connect(*addr)).await?;
                Ok(Box::new(stream))
            }
            #[cfg(unix)]
            Transport::Unix(path) => {
                let stream = retry_connect(&endpoint, policy, || UnixStream::connect(path)).await?;
                Ok(Box::new(stream))
            }
        }
    }
}

/// Server endpoint waiting for a consumer
#[derive(Debug)]
pub enum Listener {
    Memory(MemoryChannel),
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener, SocketFile),
}

impl Listener {
    /// Wait until one consumer attaches and return the channel's write half
    ///
    /// The listener is consumed: the channel serves exactly one consumer.
    pub async fn accept(self) -> Result<ChannelWriter, TriggerError> {
        match self {
            Listener::Memory(channel) => channel.accept().await,
            Listener::Tcp(listener) => {
                let endpoint = listener
                    .local_addr()
                    .map(|addr| addr.to_string())
                    .unwrap_or_else(|_| "tcp".to_string());
                let (stream, peer) = listener
                    .accept()
                    .await
                    .map_err(|e| TriggerError::accept(&endpoint, e))?;
                debug!(endpoint = %endpoint, peer = %peer, "accepted tcp consumer");
                Ok(Box::new(stream))
            }
            #[cfg(unix)]
            Listener::Unix(listener, socket_file) => {
                let (stream, _) = listener
                    .accept()
                    .await
                    .map_err(|e| TriggerError::accept(socket_file.0.display(), e))?;
                Ok(Box::new(stream))
            }
        }
    }
}

/// In-process rendezvous for a duplex pipe
///
/// `connect` creates the pipe, keeps the client end and hands the server end
/// over a queue; `accept` waits on that queue until a client shows up.
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    attach_tx: mpsc::Sender<DuplexStream>,
    attach_rx: Arc<Mutex<mpsc::Receiver<DuplexStream>>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        let (attach_tx, attach_rx) = mpsc::channel(1);
        Self {
            attach_tx,
            attach_rx: Arc::new(Mutex::new(attach_rx)),
        }
    }

    async fn connect(&self) -> Result<ChannelReader, TriggerError> {
        let (client, server) = tokio::io::duplex(MEMORY_PIPE_CAPACITY);
        self.attach_tx
            .send(server)
            .await
            .map_err(|e| TriggerError::connect("memory", 1, e))?;
        Ok(Box::new(client))
    }

    async fn accept(&self) -> Result<ChannelWriter, TriggerError> {
        let server = self
            .attach_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| TriggerError::accept("memory", "rendezvous closed"))?;
        Ok(Box::new(server))
    }
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Socket file owned by a Unix listener, removed when the listener goes away
#[cfg(unix)]
#[derive(Debug)]
pub struct SocketFile(PathBuf);

#[cfg(unix)]
impl Drop for SocketFile {
    fn drop(&mut self) {
        if is_socket(&self.0) {
            let _ = std::fs::remove_file(&self.0);
        }
    }
}

#[cfg(unix)]
fn is_socket(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|metadata| metadata.file_type().is_socket())
        .unwrap_or(false)
}

/// Clear a socket left behind by an earlier run
///
/// Anything else at the path is left alone and reported as an error.
#[cfg(unix)]
fn remove_stale_socket(path: &Path) -> io::Result<()> {
    match std::fs::symlink_metadata(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
        Ok(metadata) if metadata.file_type().is_socket() => std::fs::remove_file(path),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "path exists and is not a socket",
        )),
    }
}

/// Whether a connect error means "the server is not there yet"
fn is_not_ready(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
    )
}

async fn retry_connect<T, F, Fut>(
    endpoint: &str,
    policy: ConnectPolicy,
    mut attempt: F,
) -> Result<T, TriggerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    let max_attempts = policy.attempts.max(1);
    let mut tried = 0;
    loop {
        tried += 1;
        match attempt().await {
            Ok(stream) => return Ok(stream),
            Err(e) if tried < max_attempts && is_not_ready(&e) => {
                debug!(endpoint, attempt = tried, error = %e, "producer not ready, retrying");
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => return Err(TriggerError::connect(endpoint, tried, e)),
        }
    }
}
