//! Control server accept loop and per-client workers.
//!
//! ```text
//!   ControlServer::run
//!     loop: select { cancelled | timeout(accept_timeout, listener.accept()) }
//!            │
//!            └─ tokio::spawn(serve_connection)
//!                  loop: read_frame → spawn_blocking(handle_bytes) → write_frame
//! ```
//!
//! A failing client only ends its own task; the accept loop always goes on
//! to the next connection until the token is cancelled.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::error::ControlError;
use crate::frame::{read_frame, write_frame};
use crate::handler::CommandHandler;
use crate::protocol::ControlResponse;

/// Default bound on one accept attempt.
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause after a failed accept before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Source of control connections.
#[async_trait]
pub trait ControlListener: Send {
    /// Connection type produced by this listener.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wait for the next client. Must be cancel-safe.
    async fn accept(&mut self) -> io::Result<Self::Stream>;

    /// Human-readable endpoint for logs.
    fn endpoint(&self) -> String;
}

/// TCP control listener.
pub struct TcpControlListener {
    listener: TcpListener,
}

impl TcpControlListener {
    /// Bind to `addr`.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
        })
    }

    /// Bound address (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

#[async_trait]
impl ControlListener for TcpControlListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> io::Result<TcpStream> {
        let (stream, peer) = self.listener.accept().await?;
        tracing::debug!(peer = %peer, "control client connected");
        Ok(stream)
    }

    fn endpoint(&self) -> String {
        match self.listener.local_addr() {
            Ok(addr) => format!("tcp://{}", addr),
            Err(_) => "tcp://<unbound>".to_string(),
        }
    }
}

#[cfg(target_os = "windows")]
pub use pipe::NamedPipeControlListener;

#[cfg(target_os = "windows")]
mod pipe {
    use std::io;

    use async_trait::async_trait;
    use tokio::net::windows::named_pipe::{NamedPipeServer, ServerOptions};

    use super::ControlListener;

    /// Named pipe control listener (`\\.\pipe\<name>`).
    ///
    /// One server instance is always kept pending so clients never see the
    /// pipe missing between accepts.
    pub struct NamedPipeControlListener {
        path: String,
        pending: NamedPipeServer,
    }

    impl NamedPipeControlListener {
        /// Create the first pipe instance.
        ///
        /// # Arguments
        /// * `name` - Pipe name without the `\\.\pipe\` prefix
        pub fn create(name: &str) -> io::Result<Self> {
            let path: String = format!(r"\\.\pipe\{}", name);
            let pending: NamedPipeServer = ServerOptions::new()
                .first_pipe_instance(true)
                .create(&path)?;
            Ok(Self { path, pending })
        }
    }

    #[async_trait]
    impl ControlListener for NamedPipeControlListener {
        type Stream = NamedPipeServer;

        async fn accept(&mut self) -> io::Result<NamedPipeServer> {
            self.pending.connect().await?;
            let next: NamedPipeServer = ServerOptions::new().create(&self.path)?;
            Ok(std::mem::replace(&mut self.pending, next))
        }

        fn endpoint(&self) -> String {
            self.path.clone()
        }
    }
}

/// Accepts control clients and serves each on its own task.
#[derive(Debug, Clone)]
pub struct ControlServer {
    handler: Arc<CommandHandler>,
    accept_timeout: Duration,
}

impl ControlServer {
    /// Create a server.
    ///
    /// # Arguments
    /// * `handler` - Command executor shared by all clients
    pub fn new(handler: Arc<CommandHandler>) -> Self {
        Self {
            handler,
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
        }
    }

    /// Set the bound on one accept attempt.
    pub fn with_accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }

    /// Accept clients until `shutdown` is cancelled.
    ///
    /// Client tasks observe the same token and end at their next frame
    /// boundary.
    pub async fn run<L: ControlListener>(&self, mut listener: L, shutdown: CancellationToken) {
        tracing::info!(endpoint = %listener.endpoint(), "control server listening");

        loop {
            let accepted = tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                accepted = tokio::time::timeout(self.accept_timeout, listener.accept()) => accepted,
            };

            match accepted {
                Err(_elapsed) => continue,
                Ok(Ok(stream)) => {
                    let handler: Arc<CommandHandler> = self.handler.clone();
                    let token: CancellationToken = shutdown.child_token();
                    tokio::spawn(async move {
                        match serve_connection(stream, handler, token).await {
                            Ok(()) => tracing::debug!("control client disconnected"),
                            Err(e) => tracing::warn!(error = %e, "control client dropped"),
                        }
                    });
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }

        tracing::info!(endpoint = %listener.endpoint(), "control server stopped");
    }
}

/// Serve one client until it disconnects, violates framing, or `shutdown`
/// fires.
///
/// # Returns
/// Ok on clean disconnect or shutdown, the error that ended the connection
/// otherwise.
pub async fn serve_connection<S>(
    mut stream: S,
    handler: Arc<CommandHandler>,
    shutdown: CancellationToken,
) -> Result<(), ControlError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    loop {
        let frame: Option<Vec<u8>> = tokio::select! {
            biased;

            _ = shutdown.cancelled() => return Ok(()),
            frame = read_frame(&mut stream) => frame?,
        };
        let Some(body) = frame else {
            return Ok(());
        };

        let worker: Arc<CommandHandler> = handler.clone();
        let response: ControlResponse =
            match tokio::task::spawn_blocking(move || worker.handle_bytes(&body)).await {
                Ok(response) => response,
                Err(e) => ControlResponse::failure(format!("Error: {}", ControlError::Task(e.to_string()))),
            };

        let json: Vec<u8> = serde_json::to_vec(&response)?;
        write_frame(&mut stream, &json).await?;
    }
}
