//! # lserve
//!
//! A small HTTP/1.1 static file server with per-IP rate limiting, path
//! traversal protection, gzip for text assets and directory listings.
//!
//! Each connection carries one `GET` request line and receives one response,
//! after which it is closed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lserve::config::ServerConfig;
//! use lserve::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new(8000, ".")?;
//!     let server = Server::bind(&config).await?;
//!     println!("Listening on http://localhost:{}", server.local_addr().port());
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod files;
pub mod http;
pub mod logging;
pub mod security;
pub mod server;

#[cfg(test)]
mod test_support;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use config::{Args, ServerConfig};
pub use http::{Method, Response, StatusCode};
pub use server::{Server, ServerError};
