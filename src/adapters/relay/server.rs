//! Relay server: topic subscriptions and file fan-out

use super::codec::{encode_length, open_frame_source, read_topic, write_frame};
use crate::domain::errors::{RelayError, StudyhubError};
use crate::domain::ids::Topic;
use crate::domain::Result;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};

/// Notified when subscribers come and go
#[async_trait]
pub trait SessionListener: Send + Sync {
    async fn on_subscribe(&self, _topic: &Topic) {}

    async fn on_unsubscribe(&self, _topic: &Topic) {}
}

/// One connected subscriber
struct RelaySession {
    id: u64,
    topic: Topic,
    peer: SocketAddr,
    writer: OwnedWriteHalf,
}

/// Accepts subscribers and publishes files to them by topic
///
/// Cloning shares the session registry, so a clone can publish while another
/// runs the accept loop.
///
/// # Example
///
/// ```no_run
/// use studyhub::adapters::relay::RelayServer;
/// use studyhub::domain::Topic;
///
/// # async fn example() -> studyhub::domain::Result<()> {
/// let server = RelayServer::new();
/// let addr = server.bind("127.0.0.1:14638").await?;
/// println!("Relay listening on {addr}");
///
/// let accept = server.clone();
/// tokio::spawn(async move { accept.serve().await });
///
/// let delivered = server
///     .publish(&Topic::new("foo").unwrap(), "/var/spool/studyhub/foo/1.dcm")
///     .await?;
/// println!("Delivered to {delivered} subscribers");
/// server.stop();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RelayServer {
    sessions: Arc<Mutex<Vec<RelaySession>>>,
    listener: Arc<Mutex<Option<TcpListener>>>,
    session_listener: Option<Arc<dyn SessionListener>>,
    next_session_id: Arc<AtomicU64>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl RelayServer {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            sessions: Arc::new(Mutex::new(Vec::new())),
            listener: Arc::new(Mutex::new(None)),
            session_listener: None,
            next_session_id: Arc::new(AtomicU64::new(1)),
            shutdown: Arc::new(shutdown),
        }
    }

    pub fn with_session_listener(mut self, listener: impl SessionListener + 'static) -> Self {
        self.session_listener = Some(Arc::new(listener));
        self
    }

    /// Bind the listening socket and return its local address
    ///
    /// Port 0 picks a free port.
    pub async fn bind(&self, addr: &str) -> Result<SocketAddr> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RelayError::ConnectionFailed {
                addr: addr.to_string(),
                message: e.to_string(),
            })?;
        let local_addr = listener.local_addr()?;
        *self.listener.lock().await = Some(listener);
        Ok(local_addr)
    }

    /// Bind and serve until stopped
    pub async fn start(&self, addr: &str) -> Result<()> {
        self.bind(addr).await?;
        self.serve().await
    }

    /// Accept subscribers on the bound socket until [`stop`](Self::stop)
    ///
    /// A stop requested before this call is honoured, serving returns at
    /// once and drops the listener.
    pub async fn serve(&self) -> Result<()> {
        let listener = self.listener.lock().await.take().ok_or_else(|| {
            StudyhubError::Relay(RelayError::ConnectionFailed {
                addr: "unbound".to_string(),
                message: "bind() must be called before serve()".to_string(),
            })
        })?;
        let local_addr = listener.local_addr()?;

        let mut shutdown_rx = self.shutdown.subscribe();
        let stopped_early = *shutdown_rx.borrow_and_update();

        if !stopped_early {
            tracing::info!(addr = %local_addr, "Relay server serving");
        }

        while !stopped_early {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let server = self.clone();
                        tokio::spawn(async move { server.handle_connection(stream, peer).await });
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to accept relay connection"),
                }
            }
        }

        // Dropping the write halves signals end of stream to every subscriber
        let closed = {
            let mut sessions = self.sessions.lock().await;
            let count = sessions.len();
            sessions.clear();
            count
        };
        // The stop was consumed by this run, a rebound server serves again
        self.shutdown.send_replace(false);
        tracing::info!(addr = %local_addr, closed_sessions = closed, "Relay server stopped");
        Ok(())
    }

    /// Request the accept loop to stop
    ///
    /// The request holds until a [`serve`](Self::serve) run observes it.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    /// Send the file at `path` to every subscriber of `topic`
    ///
    /// Returns the number of subscribers the file was fully delivered to.
    /// Without subscribers this is a no-op returning 0. A subscriber whose
    /// frame could not be completed is dropped, the others still get the
    /// file.
    ///
    /// # Errors
    ///
    /// [`RelayError::FileTooLarge`] if the file doesn't fit the length
    /// prefix, or an I/O error if it can't be read. A read failure after
    /// delivery started is returned once every subscriber has been tried.
    pub async fn publish(&self, topic: &Topic, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| {
                StudyhubError::Io(format!(
                    "Failed to read {} for publishing: {}",
                    path.display(),
                    e
                ))
            })?
            .len();
        encode_length(size)?;

        // Holding the registry lock keeps files on a topic in publish order
        let mut sessions = self.sessions.lock().await;
        let mut delivered = 0;
        let mut failed = Vec::new();
        let mut source_error = None;

        for session in sessions.iter_mut().filter(|s| s.topic == *topic) {
            let (mut file, size) = match open_frame_source(path).await {
                Ok(source) => source,
                Err(e) => {
                    source_error = Some(e);
                    break;
                }
            };

            // A partial frame can't be resumed, the session goes either way
            if let Err(e) = write_frame(&mut session.writer, &mut file, size, path).await {
                tracing::warn!(
                    topic = %topic,
                    peer = %session.peer,
                    error = %e,
                    "Dropping relay session after failed delivery"
                );
                failed.push(session.id);
                if !matches!(e, StudyhubError::Relay(_)) && source_error.is_none() {
                    source_error = Some(e);
                }
                continue;
            }
            delivered += 1;
        }

        if !failed.is_empty() {
            sessions.retain(|s| !failed.contains(&s.id));
        }
        drop(sessions);

        if let Some(e) = source_error {
            tracing::error!(
                topic = %topic,
                path = %path.display(),
                delivered,
                dropped = failed.len(),
                error = %e,
                "Publishing failed"
            );
            return Err(e);
        }

        tracing::debug!(
            topic = %topic,
            path = %path.display(),
            bytes = size,
            delivered,
            "File published"
        );
        Ok(delivered)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn subscriber_count(&self, topic: &Topic) -> usize {
        self.sessions
            .lock()
            .await
            .iter()
            .filter(|s| s.topic == *topic)
            .count()
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let topic = match read_topic(&mut reader).await {
            Ok(topic) => topic,
            Err(StudyhubError::Relay(e)) if e.is_disconnect() => {
                // Reachability probes connect and close without a topic
                tracing::debug!(peer = %peer, "Connection closed before subscribing");
                return;
            }
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "Rejected relay connection");
                return;
            }
        };

        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        self.sessions.lock().await.push(RelaySession {
            id,
            topic: topic.clone(),
            peer,
            writer: write_half,
        });
        tracing::info!(topic = %topic, peer = %peer, session = id, "Subscriber connected");

        if let Some(listener) = &self.session_listener {
            listener.on_subscribe(&topic).await;
        }

        // Subscribers never send after the topic, read until they close
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut discard = [0u8; 1024];
        loop {
            tokio::select! {
                read = reader.read(&mut discard) => match read {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(
                            topic = %topic,
                            peer = %peer,
                            error = %e,
                            "Subscriber stream failed"
                        );
                        break;
                    }
                },
                // Only a stop or the reset after it is ever sent
                _ = shutdown_rx.changed() => break,
            }
        }

        let removed = {
            let mut sessions = self.sessions.lock().await;
            let position = sessions.iter().position(|s| s.id == id);
            position.map(|index| sessions.remove(index))
        };
        if let Some(mut session) = removed {
            let _ = session.writer.shutdown().await;
        }
        tracing::info!(topic = %topic, peer = %peer, session = id, "Subscriber disconnected");

        if let Some(listener) = &self.session_listener {
            listener.on_unsubscribe(&topic).await;
        }
    }
}

impl Default for RelayServer {
    fn default() -> Self {
        Self::new()
    }
}
