//! Whole-body gzip for text assets.
//!
//! Bodies are compressed entirely in memory before any byte hits the socket.
//! That is fine for small static assets but means a large `.js` bundle is
//! held twice in memory while it is served.

use std::io::{self, Write};

use flate2::Compression;
use flate2::write::GzEncoder;

/// Extensions whose bodies are sent gzip-encoded.
const GZIP_EXTENSIONS: &[&str] = &["html", "css", "js"];

/// Returns `true` if files with this (lowercased) extension are compressed.
pub fn should_gzip(extension: &str) -> bool {
    GZIP_EXTENSIONS.contains(&extension)
}

/// Compresses `data` into a complete gzip member.
pub fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
