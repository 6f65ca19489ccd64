//! HTTP/1.1 response builder and serializer.
//!
//! Every response this server writes is the last one on its connection, so
//! serialization always emits `Connection: close` and a `Content-Length`
//! measured on the final (possibly compressed) body.

use std::io;

use bytes::{BufMut, BytesMut};

use super::{StatusCode, compress};

const FORBIDDEN_BODY: &str = "<html><body><h1>403 Forbidden</h1></body></html>";
const NOT_FOUND_BODY: &str = "<html><body><h1>404 Not Found</h1></body></html>";
const METHOD_NOT_ALLOWED_BODY: &str = "<html><body><h1>405 Method Not Allowed</h1></body></html>";

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use lserve::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("Content-Type", "text/plain")
///     .body("hello");
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Connection: close\r\n"));
/// assert!(text.ends_with("Content-Length: 5\r\n\r\nhello"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// `403 Forbidden` with the fixed HTML body.
    pub fn forbidden() -> Self {
        Self::html(StatusCode::Forbidden, FORBIDDEN_BODY)
    }

    /// `404 Not Found` with the fixed HTML body.
    pub fn not_found() -> Self {
        Self::html(StatusCode::NotFound, NOT_FOUND_BODY)
    }

    /// `405 Method Not Allowed`, advertising `Allow: GET`.
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::MethodNotAllowed)
            .header("Allow", "GET")
            .header("Content-Type", "text/html")
            .body(METHOD_NOT_ALLOWED_BODY)
    }

    /// A `text/html` response with the given markup.
    pub fn html(status: StatusCode, markup: impl Into<String>) -> Self {
        Self::new(status)
            .header("Content-Type", "text/html")
            .body(markup)
    }

    /// Appends a response header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the response body from a string.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Replaces the body with its gzip encoding and adds
    /// `Content-Encoding: gzip`.
    ///
    /// # Errors
    ///
    /// Propagates any error from the encoder.
    pub fn gzip(mut self) -> io::Result<Self> {
        self.body = compress::gzip(&self.body)?;
        Ok(self.header("Content-Encoding", "gzip"))
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the first value for `name` (case-insensitive), if set.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body as it will be written.
    pub fn body_ref(&self) -> &[u8] {
        &self.body
    }

    /// Serializes the response into a `BytesMut` buffer using HTTP/1.1 wire format.
    ///
    /// Automatically adds:
    /// - `Content-Type: text/plain; charset=utf-8` if the body is non-empty and no
    ///   `Content-Type` header was set.
    /// - `Connection: close`.
    /// - `Content-Length: <n>`, always last, counting body bytes.
    pub fn into_bytes(mut self) -> BytesMut {
        let content_length = self.body.len();

        if !self.body.is_empty() && self.header_value("content-type").is_none() {
            self.headers
                .push(("Content-Type".into(), "text/plain; charset=utf-8".into()));
        }
        if self.header_value("connection").is_none() {
            self.headers.push(("Connection".into(), "close".into()));
        }

        let estimated_size = 128 + self.headers.len() * 64 + content_length;
        let mut buf = BytesMut::with_capacity(estimated_size);

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );

        for (name, value) in &self.headers {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }
        buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());

        buf.put(&b"\r\n"[..]);
        buf.put(self.body.as_slice());

        buf
    }
}
