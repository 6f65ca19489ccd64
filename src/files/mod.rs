//! Building `200 OK` responses from the filesystem.
//!
//! [`FileResponder`] turns a resolved target into either a file response
//! (with content type, date and cache headers, gzip for text assets) or a
//! generated directory listing.

use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio::fs;

use crate::http::{Response, StatusCode, compress, mime};

pub mod listing;

use listing::ListingEntry;

/// Value of the `Cache-Control` header on file responses.
pub const CACHE_CONTROL: &str = "public, max-age=3600";

/// How far in the future `Expires` points, measured from server start.
pub const EXPIRES_AFTER: Duration = Duration::from_secs(3600);

/// Produces file and directory-listing responses.
///
/// The `Expires` value is fixed when the responder is created and reused for
/// every response, so it drifts towards the past on long-running servers.
#[derive(Debug, Clone)]
pub struct FileResponder {
    expires: String,
}

impl Default for FileResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl FileResponder {
    pub fn new() -> Self {
        Self::starting_at(SystemTime::now())
    }

    /// A responder whose `Expires` header is `start + 1h`.
    pub fn starting_at(start: SystemTime) -> Self {
        Self {
            expires: httpdate::fmt_http_date(start + EXPIRES_AFTER),
        }
    }

    pub fn expires(&self) -> &str {
        &self.expires
    }

    /// Reads `path` fully and builds its response.
    ///
    /// # Errors
    ///
    /// Any error reading the file, or from the gzip encoder.
    pub async fn file(&self, path: &Path) -> io::Result<Response> {
        let data = fs::read(path).await?;
        self.file_response(path, data)
    }

    /// Builds the response for file contents already in memory. `path` only
    /// selects the content type and whether to compress.
    pub fn file_response(&self, path: &Path, data: Vec<u8>) -> io::Result<Response> {
        let extension = mime::extension_of(path);
        let response = Response::new(StatusCode::Ok)
            .header("Content-Type", mime::content_type(&extension))
            .header("Connection", "close")
            .header("Date", httpdate::fmt_http_date(SystemTime::now()))
            .header("Cache-Control", CACHE_CONTROL)
            .header("Expires", self.expires.as_str())
            .body_bytes(data);

        if compress::should_gzip(&extension) {
            response.gzip()
        } else {
            Ok(response)
        }
    }

    /// Lists the immediate children of `dir`, linking them under
    /// `request_path`.
    ///
    /// Entries are sorted by name. Symlinks to directories count as
    /// directories.
    pub async fn listing(&self, dir: &Path, request_path: &str) -> io::Result<Response> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let is_dir = match fs::metadata(entry.path()).await {
                Ok(meta) => meta.is_dir(),
                Err(_) => entry.file_type().await.is_ok_and(|t| t.is_dir()),
            };
            entries.push(ListingEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        entries.sort();

        Ok(Response::html(StatusCode::Ok, listing::render(request_path, &entries))
            .header("Connection", "close"))
    }
}
