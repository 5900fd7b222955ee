//! Relay subscriber

use super::codec::{read_file_frame, transport_error, write_topic};
use crate::domain::errors::RelayError;
use crate::domain::ids::Topic;
use crate::domain::Result;
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use uuid::Uuid;

/// What the subscriber does after a file was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveAction {
    Continue,
    Stop,
}

/// Consumes received files
///
/// The handler owns the file at `path` and is free to move or delete it.
#[async_trait]
pub trait ReceiveHandler: Send + Sync {
    async fn receive(&self, path: &Path) -> Result<ReceiveAction>;
}

/// [`ReceiveHandler`] backed by a closure
pub struct FnReceiver<F>(F);

#[async_trait]
impl<F, Fut> ReceiveHandler for FnReceiver<F>
where
    F: Fn(PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ReceiveAction>> + Send,
{
    async fn receive(&self, path: &Path) -> Result<ReceiveAction> {
        (self.0)(path.to_path_buf()).await
    }
}

/// Adapt an async closure into a [`ReceiveHandler`]
pub fn receive_fn<F, Fut>(f: F) -> FnReceiver<F>
where
    F: Fn(PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ReceiveAction>> + Send,
{
    FnReceiver(f)
}

/// Connects to a relay server and receives files for one topic
///
/// # Example
///
/// ```no_run
/// use studyhub::adapters::relay::{receive_fn, ReceiveAction, RelayClient};
/// use studyhub::domain::Topic;
///
/// # async fn example() -> studyhub::domain::Result<()> {
/// let client = RelayClient::new("127.0.0.1:14638", "/var/lib/studyhub/incoming");
/// let received = client
///     .subscribe(
///         &Topic::new("foo").unwrap(),
///         receive_fn(|path| async move {
///             println!("Received {}", path.display());
///             Ok(ReceiveAction::Continue)
///         }),
///     )
///     .await?;
/// println!("{received} files received");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RelayClient {
    addr: String,
    folder: PathBuf,
}

impl RelayClient {
    pub fn new(addr: impl Into<String>, folder: impl Into<PathBuf>) -> Self {
        Self {
            addr: addr.into(),
            folder: folder.into(),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Subscribe to `topic` and pass every received file to `handler`
    ///
    /// Runs until the handler returns [`ReceiveAction::Stop`] or the server
    /// closes the stream between two files. Returns the number of files
    /// handed to the handler.
    ///
    /// # Errors
    ///
    /// - [`RelayError::InvalidFolder`] if the folder is not a directory
    /// - [`RelayError::ConnectionFailed`] if the server can't be reached
    /// - [`RelayError::Disconnected`] if the stream ends inside a file
    /// - Any error returned by the handler
    pub async fn subscribe<H>(&self, topic: &Topic, handler: H) -> Result<usize>
    where
        H: ReceiveHandler,
    {
        let is_dir = tokio::fs::metadata(&self.folder)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(RelayError::InvalidFolder(self.folder.display().to_string()).into());
        }

        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| RelayError::ConnectionFailed {
                addr: self.addr.clone(),
                message: e.to_string(),
            })?;
        let (read_half, mut write_half) = stream.into_split();
        write_topic(&mut write_half, topic).await?;
        tracing::info!(topic = %topic, addr = %self.addr, "Subscribed to relay");

        let mut reader = BufReader::new(read_half);
        let mut received = 0;

        loop {
            // End of stream between two files is a clean close by the server
            let at_eof = reader
                .fill_buf()
                .await
                .map_err(|e| transport_error(e, "while waiting for the next file"))?
                .is_empty();
            if at_eof {
                tracing::info!(topic = %topic, received, "Relay closed the subscription");
                break;
            }

            let dest = self.folder.join(Uuid::new_v4().to_string());
            let size = read_file_frame(&mut reader, &dest).await?;

            received += 1;
            tracing::debug!(topic = %topic, path = %dest.display(), bytes = size, "File received");

            if handler.receive(&dest).await? == ReceiveAction::Stop {
                break;
            }
        }

        // The server may already be gone
        let _ = write_half.shutdown().await;
        Ok(received)
    }
}
