//! Async TCP acceptor using Tokio.
//!
//! Accepts TCP connections and hands each one to the shared [`Pipeline`] on
//! its own task. Every connection carries exactly one request and one
//! response; there is no keep-alive.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;

pub mod pipeline;

pub use pipeline::{Outcome, Pipeline};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// The static file server.
///
/// # Examples
///
/// ```rust,no_run
/// use lserve::config::ServerConfig;
/// use lserve::server::Server;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::new(8000, "./public")?;
///     let server = Server::bind(&config).await?;
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    pipeline: Arc<Pipeline>,
}

impl Server {
    /// Binds `config.listen_addr()` and prepares a pipeline for `config.root`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let pipeline = Pipeline::from_config(config)?;
        Self::bind_with(config.listen_addr(), pipeline).await
    }

    /// Binds `addr` and serves with an already-built pipeline.
    pub async fn bind_with(addr: SocketAddr, pipeline: Pipeline) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            pipeline: Arc::new(pipeline),
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Accepts connections until the process is terminated.
    ///
    /// A failed `accept` is logged and skipped. Failures inside a connection
    /// stay in that connection's task.
    pub async fn run(self) -> Result<(), ServerError> {
        info!(
            address = %self.local_addr,
            root = %self.pipeline.resolver().root().display(),
            "serving files"
        );

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let pipeline = Arc::clone(&self.pipeline);

            tokio::spawn(async move {
                match pipeline.handle(stream, peer_addr.ip()).await {
                    Ok(outcome) => match outcome.status() {
                        Some(status) => {
                            debug!(peer = %peer_addr, ?outcome, %status, "connection closed")
                        }
                        None => debug!(peer = %peer_addr, ?outcome, "connection closed unanswered"),
                    },
                    Err(e) => warn!(peer = %peer_addr, error = %e, "connection closed with error"),
                }
            });
        }
    }
}
