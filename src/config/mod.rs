//! Startup configuration: command-line flags and the validated server config.

use std::ffi::OsString;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;

/// Flags the server understands; anything else on the command line is
/// dropped before parsing.
const KNOWN_FLAGS: &[&str] = &["--port", "--dir"];

/// Command-line flags.
#[derive(Debug, Clone, Parser)]
#[command(name = "lserve", version, about = "Serve a directory over HTTP/1.1")]
pub struct Args {
    /// Port to listen on (all interfaces).
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory to serve.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

impl Args {
    /// Parses the process arguments, ignoring unrecognized ones.
    pub fn from_env() -> Self {
        Self::parse_from(retain_known(std::env::args_os()))
    }
}

/// Keeps the program name, `--help`/`--version`, and each known flag together
/// with its value (`--port 80` or `--port=80`). Everything else is dropped,
/// including a known flag given last with no value, which then falls back to
/// its default.
pub fn retain_known<I>(raw: I) -> Vec<OsString>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut raw = raw.into_iter().map(Into::into);
    let mut kept: Vec<OsString> = raw.next().into_iter().collect();

    while let Some(arg) = raw.next() {
        let (passthrough, known, inline_value) = {
            let text = arg.to_string_lossy();
            let flag = text.split_once('=').map_or(text.as_ref(), |(flag, _)| flag);
            (
                text == "--help" || text == "--version",
                KNOWN_FLAGS.contains(&flag),
                text.contains('='),
            )
        };
        if passthrough {
            kept.push(arg);
        } else if known && inline_value {
            kept.push(arg);
        } else if known {
            if let Some(value) = raw.next() {
                kept.push(arg);
                kept.push(value);
            }
        }
    }
    kept
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("root directory {} cannot be opened: {source}", .path.display())]
    RootNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

/// Validated, immutable server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Canonical absolute path of the served directory.
    pub root: PathBuf,
}

impl ServerConfig {
    /// Builds a config, canonicalizing `dir`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::RootNotFound`] — `dir` does not exist or is unreadable.
    /// - [`ConfigError::NotADirectory`] — `dir` is a file.
    pub fn new(port: u16, dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let root = std::fs::canonicalize(dir).map_err(|source| ConfigError::RootNotFound {
            path: dir.to_path_buf(),
            source,
        })?;
        if !root.is_dir() {
            return Err(ConfigError::NotADirectory(root));
        }
        Ok(Self { port, root })
    }

    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        Self::new(args.port, &args.dir)
    }

    /// Address the listener binds: every interface on the configured port.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}
