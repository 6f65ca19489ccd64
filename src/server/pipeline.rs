//! The per-connection request pipeline.
//!
//! Each accepted connection is driven through exactly one pass:
//!
//! ```text
//! Accepted ─► BlockCheck ──blocked──────────────► 403
//!                 │
//!                 ▼
//!            RequestRead ──empty/malformed──────► (no response)
//!                 │
//!                 ▼
//!            MethodCheck ──not GET──────────────► 405
//!                 │
//!                 ▼
//!             RateCheck ──over threshold────────► 403
//!                 │
//!                 ▼
//!            PathResolve ──escapes root─────────► 403
//!                 ├────────missing──────────────► 404
//!                 ├────────directory────────────► 200 listing
//!                 └────────file─────────────────► 200 file
//! ```
//!
//! Every branch ends with the stream being shut down.

use std::io;
use std::net::IpAddr;
use std::time::SystemTime;

use thiserror::Error;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::files::FileResponder;
use crate::http::{Method, RequestError, RequestRecord, Response, StatusCode};
use crate::logging::ACCESS_TARGET;
use crate::security::{PathError, PathResolver, RateDecision, RateLimiter};

/// Longest request line accepted, terminator included.
pub const MAX_REQUEST_LINE: usize = 8 * 1024;

/// Which terminal state a connection ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No usable request line; nothing was written.
    Dropped,
    /// The client was already on the blocklist.
    Blocked,
    MethodNotAllowed,
    /// This request pushed the client over the rate limit.
    RateLimited,
    /// The path resolved outside the root.
    Forbidden,
    NotFound,
    Listing,
    File,
}

impl Outcome {
    /// The status written to the client, if any.
    pub fn status(self) -> Option<StatusCode> {
        match self {
            Self::Dropped => None,
            Self::Blocked | Self::RateLimited | Self::Forbidden => Some(StatusCode::Forbidden),
            Self::MethodNotAllowed => Some(StatusCode::MethodNotAllowed),
            Self::NotFound => Some(StatusCode::NotFound),
            Self::Listing | Self::File => Some(StatusCode::Ok),
        }
    }
}

/// Shared per-server state plus the logic that answers one connection.
///
/// One `Pipeline` is built at startup and shared across connection tasks
/// through an `Arc`; the rate limiter inside it is the only mutable part.
#[derive(Debug)]
pub struct Pipeline {
    resolver: PathResolver,
    limiter: RateLimiter,
    files: FileResponder,
}

impl Pipeline {
    pub fn new(resolver: PathResolver, limiter: RateLimiter, files: FileResponder) -> Self {
        Self {
            resolver,
            limiter,
            files,
        }
    }

    /// Builds a pipeline with the default rate limits for `config.root`.
    ///
    /// # Errors
    ///
    /// Fails if the root can no longer be canonicalized.
    pub fn from_config(config: &ServerConfig) -> io::Result<Self> {
        Ok(Self::new(
            PathResolver::new(&config.root)?,
            RateLimiter::default(),
            FileResponder::new(),
        ))
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Answers one request on `stream` and closes it.
    ///
    /// The stream is shut down whichever branch is taken, including after a
    /// failed write.
    ///
    /// # Errors
    ///
    /// Only I/O failures while writing the response are returned; every
    /// protocol or policy problem is answered (or dropped) here.
    pub async fn handle<S>(&self, stream: S, client_ip: IpAddr) -> io::Result<Outcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut stream = BufReader::new(stream);
        let result = self.respond(&mut stream, client_ip).await;
        if let Err(e) = stream.shutdown().await {
            debug!(%client_ip, error = %e, "shutdown failed");
        }
        result
    }

    async fn respond<S>(&self, stream: &mut BufReader<S>, client_ip: IpAddr) -> io::Result<Outcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if self.limiter.is_blocked(client_ip) {
            debug!(%client_ip, "client is blocked");
            send(stream, Response::forbidden()).await?;
            return Ok(Outcome::Blocked);
        }

        let request = match read_request(stream, client_ip).await {
            Ok(request) => request,
            Err(e) => {
                debug!(%client_ip, error = %e, "dropping connection without a response");
                return Ok(Outcome::Dropped);
            }
        };

        if request.method != Method::Get {
            debug!(%client_ip, method = %request.method, "method not allowed");
            send(stream, Response::method_not_allowed()).await?;
            return Ok(Outcome::MethodNotAllowed);
        }

        if self.limiter.check_and_record(client_ip) == RateDecision::RateLimited {
            send(stream, Response::forbidden()).await?;
            return Ok(Outcome::RateLimited);
        }

        let target = match self.resolver.resolve(&request.decoded_path).await {
            Ok(target) => target,
            Err(PathError::Forbidden(path)) => {
                debug!(%client_ip, path = %path.display(), "path escapes root");
                send(stream, Response::forbidden()).await?;
                return Ok(Outcome::Forbidden);
            }
        };

        if !target.exists {
            send(stream, Response::not_found()).await?;
            return Ok(Outcome::NotFound);
        }

        let (built, outcome) = if target.is_directory {
            let listing = self
                .files
                .listing(&target.absolute_path, &request.decoded_path)
                .await;
            (listing, Outcome::Listing)
        } else {
            (self.files.file(&target.absolute_path).await, Outcome::File)
        };

        let response = match built {
            Ok(response) => response,
            Err(e) => {
                // Deleted or unreadable between resolution and read.
                debug!(%client_ip, path = %target.absolute_path.display(), error = %e, "read failed");
                send(stream, Response::not_found()).await?;
                return Ok(Outcome::NotFound);
            }
        };

        send(stream, response).await?;
        log_access(&request, StatusCode::Ok);
        Ok(outcome)
    }
}

/// Reads and parses the request line; headers and any body are left unread.
async fn read_request<R>(reader: &mut R, client_ip: IpAddr) -> Result<RequestRecord, ReadError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(256);
    (&mut *reader)
        .take(MAX_REQUEST_LINE as u64 + 1)
        .read_until(b'\n', &mut buf)
        .await?;

    if buf.len() > MAX_REQUEST_LINE {
        return Err(RequestError::TooLong {
            max_bytes: MAX_REQUEST_LINE,
        }
        .into());
    }

    let line = String::from_utf8(buf).map_err(|_| ReadError::NotUtf8)?;
    Ok(RequestRecord::parse(&line, client_ip)?)
}

#[derive(Debug, Error)]
enum ReadError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("request line is not valid UTF-8")]
    NotUtf8,
}

async fn send<W>(stream: &mut W, response: Response) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    stream.write_all(&response.into_bytes()).await?;
    stream.flush().await
}

fn log_access(request: &RequestRecord, status: StatusCode) {
    info!(
        target: ACCESS_TARGET,
        "[{}] {} {} {} {}",
        httpdate::fmt_http_date(SystemTime::now()),
        request.client_ip,
        request.method,
        request.decoded_path,
        status
    );
}
