//! Request-level protections: root containment and per-IP rate limiting.
//!
//! - [`PathResolver`] maps request paths into the server root and refuses
//!   anything whose canonical form escapes it.
//! - [`RateLimiter`] counts requests per client IP and temporarily blocks
//!   clients that pass the threshold.

pub mod path;
pub mod rate_limit;

pub use path::{PathError, PathResolver, ResolvedTarget};
pub use rate_limit::{RateDecision, RateLimiter};
