//! HTTP/1.1 protocol types for the file server.
//!
//! Only the request line is ever parsed, and every response closes the
//! connection. This module provides [`Method`], [`StatusCode`], the
//! [`RequestRecord`] parsed from a request line, and the [`Response`] writer.

use std::fmt;

pub mod compress;
pub mod mime;
pub mod request;
pub mod response;

pub use request::{RequestError, RequestRecord};
pub use response::Response;

/// An HTTP response status code.
///
/// Limited to the outcomes the server can actually produce.
///
/// # Examples
///
/// ```
/// use lserve::http::StatusCode;
///
/// let status = StatusCode::Forbidden;
/// assert_eq!(status.as_u16(), 403);
/// assert_eq!(status.canonical_reason(), "Forbidden");
/// assert_eq!(status.to_string(), "403 Forbidden");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    Ok = 200,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
}

impl StatusCode {
    /// Returns the numeric status code as a `u16`.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the canonical reason phrase for this status code.
    pub fn canonical_reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.canonical_reason())
    }
}

/// An HTTP request method.
///
/// `GET` is the only method the server answers; everything else is kept
/// verbatim so it can be logged before the `405`.
///
/// # Examples
///
/// ```
/// use lserve::http::Method;
///
/// let method: Method = "GET".parse().unwrap();
/// assert_eq!(method, Method::Get);
///
/// let other: Method = "BREW".parse().unwrap();
/// assert_eq!(other.as_str(), "BREW");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    /// Any other token found in the method position.
    Custom(String),
}

impl Method {
    /// Returns the method as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "GET" => Self::Get,
            other => Self::Custom(other.to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lines() {
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        assert_eq!(StatusCode::NotFound.to_string(), "404 Not Found");
        assert_eq!(
            StatusCode::MethodNotAllowed.to_string(),
            "405 Method Not Allowed"
        );
    }

    #[test]
    fn methods_are_case_sensitive() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!(
            "get".parse::<Method>().unwrap(),
            Method::Custom("get".to_owned())
        );
    }

    #[test]
    fn everything_but_get_is_custom() {
        for token in ["HEAD", "POST", "DELETE", "BREW"] {
            let method: Method = token.parse().unwrap();
            assert_eq!(method, Method::Custom(token.to_owned()));
            assert_eq!(method.to_string(), token);
        }
    }
}
