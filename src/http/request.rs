//! Request-line parsing.
//!
//! The server never looks past the first line of a request: headers and
//! bodies are ignored, so a request is fully described by its method, its
//! path and the address it came from.

use std::net::IpAddr;

use percent_encoding::percent_decode_str;
use thiserror::Error;

use super::Method;

/// Reasons a request line is rejected. None of these produce a response; the
/// connection is simply closed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("empty request line")]
    Empty,

    #[error("request line has no path: {line:?}")]
    MissingPath { line: String },

    #[error("request line exceeds {max_bytes} bytes")]
    TooLong { max_bytes: usize },
}

/// A parsed request line plus the peer it came from.
///
/// # Examples
///
/// ```
/// use std::net::{IpAddr, Ipv4Addr};
/// use lserve::http::{Method, RequestRecord};
///
/// let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
/// let req = RequestRecord::parse("GET /my%20docs/a.txt?v=2 HTTP/1.1", ip).unwrap();
///
/// assert_eq!(req.method, Method::Get);
/// assert_eq!(req.raw_path, "/my%20docs/a.txt?v=2");
/// assert_eq!(req.decoded_path, "/my docs/a.txt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub method: Method,
    /// The request target exactly as sent.
    pub raw_path: String,
    /// The target with query/fragment removed and percent-escapes decoded.
    pub decoded_path: String,
    pub client_ip: IpAddr,
}

impl RequestRecord {
    /// Parses a request line such as `GET /index.html HTTP/1.1`.
    ///
    /// Trailing `\r\n` is tolerated. Tokens are separated by single spaces and
    /// only the first two are required; the version is not checked. A doubled
    /// space therefore yields an empty path, which names the root.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Empty`] — the line is blank.
    /// - [`RequestError::MissingPath`] — only one token was present.
    pub fn parse(line: &str, client_ip: IpAddr) -> Result<Self, RequestError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(RequestError::Empty);
        }

        let mut tokens = line.split(' ');
        let method = tokens.next().ok_or(RequestError::Empty)?;
        let raw_path = tokens.next().ok_or_else(|| RequestError::MissingPath {
            line: line.to_owned(),
        })?;

        let method: Method = method.parse().unwrap_or_else(|never| match never {});

        Ok(Self {
            method,
            raw_path: raw_path.to_owned(),
            decoded_path: decode_path(raw_path),
            client_ip,
        })
    }
}

/// Strips the query string and fragment, then percent-decodes what is left.
///
/// `+` is left alone (it is only a space in form bodies), and byte sequences
/// that do not decode to UTF-8 are replaced rather than rejected.
pub fn decode_path(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    percent_decode_str(&raw[..end])
        .decode_utf8_lossy()
        .into_owned()
}
