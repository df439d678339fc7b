//! Accept loop and per-connection handling for the raw TCP relay.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::middleware::device::DeviceAllowlist;
use crate::response::StatusResponse;

use super::RelayMessage;

/// Longest message accepted from a device, newline included.
pub const MAX_LINE_BYTES: u64 = 4096;

const READ_CHUNK_BYTES: usize = 1024;

/// Pause after a failed `accept` (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Client sent nothing within {0:?}")]
    ReadTimeout(Duration),
}

/// Listens for device socket connections and serves each on its own task.
pub struct RelayServer {
    listener: TcpListener,
    read_timeout: Duration,
    allowlist: Arc<DeviceAllowlist>,
    dispatch: mpsc::Sender<RelayMessage>,
}

impl RelayServer {
    pub async fn bind(
        addr: SocketAddr,
        read_timeout: Duration,
        allowlist: DeviceAllowlist,
        dispatch: mpsc::Sender<RelayMessage>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            read_timeout,
            allowlist: Arc::new(allowlist),
            dispatch,
        })
    }

    /// The address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop until `cancel` fires.
    ///
    /// Connections already in flight are left to finish on their own.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "Relay listening");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Relay stopping");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if !self.allowlist.permits(peer.ip()) {
                            tracing::warn!(%peer, "Relay connection from untrusted source dropped");
                            continue;
                        }
                        let dispatch = self.dispatch.clone();
                        let read_timeout = self.read_timeout;
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, peer, read_timeout, dispatch).await {
                                tracing::warn!(%peer, error = %e, "Relay connection failed");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Relay accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }
        }
    }
}

/// Read one message, acknowledge it, and queue it for processing.
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    read_timeout: Duration,
    dispatch: mpsc::Sender<RelayMessage>,
) -> Result<(), RelayError> {
    let (reader, mut writer) = stream.split();
    let mut reader = reader.take(MAX_LINE_BYTES);

    let message = tokio::time::timeout(read_timeout, read_message(&mut reader))
        .await
        .map_err(|_| RelayError::ReadTimeout(read_timeout))??;
    if message.iter().all(u8::is_ascii_whitespace) {
        tracing::debug!(%peer, "Relay client closed without sending data");
        return Ok(());
    }

    let reply = match first_json_value(&message) {
        Some(Ok(body)) => {
            tracing::debug!(%peer, bytes = message.len(), "Relay message received");
            match dispatch.send(RelayMessage { peer, body }).await {
                Ok(()) => StatusResponse::received(),
                Err(_) => {
                    tracing::error!(%peer, "Relay processor is gone, message dropped");
                    StatusResponse::error("relay unavailable")
                }
            }
        }
        Some(Err(e)) => {
            tracing::warn!(%peer, error = %e, "Relay message is not valid JSON");
            StatusResponse::error(format!("invalid JSON: {e}"))
        }
        None => StatusResponse::error("invalid JSON: empty message"),
    };

    let bytes = serde_json::to_vec(&reply).map_err(io::Error::other)?;
    writer.write_all(&bytes).await?;
    writer.shutdown().await?;
    Ok(())
}

/// Collect bytes until a newline, one complete JSON value, EOF, or the
/// size cap, whichever comes first.
async fn read_message<R>(reader: &mut R) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut message = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_BYTES];

    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        message.extend_from_slice(&chunk[..read]);

        if let Some(newline) = message.iter().position(|b| *b == b'\n') {
            message.truncate(newline + 1);
            break;
        }
        if is_complete(&message) {
            break;
        }
    }

    Ok(message)
}

/// True once `buf` holds a whole JSON value, or bytes that can never become one.
fn is_complete(buf: &[u8]) -> bool {
    match first_json_value(buf) {
        Some(Ok(_)) => true,
        Some(Err(e)) => !e.is_eof(),
        None => false,
    }
}

fn first_json_value(buf: &[u8]) -> Option<Result<Value, serde_json::Error>> {
    serde_json::Deserializer::from_slice(buf)
        .into_iter::<Value>()
        .next()
}
