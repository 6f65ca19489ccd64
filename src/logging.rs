//! Subscriber setup for the binary.
//!
//! Two fmt layers share one registry. Diagnostics are filtered by `RUST_LOG`
//! (default `info`). Access lines go to their own layer under
//! [`ACCESS_TARGET`]: always on at info, and printed bare, without the
//! timestamp, level or target prefix, since the line carries its own date.

use tracing::{Level, Subscriber};
use tracing_subscriber::filter::{Directive, EnvFilter, ParseError, Targets};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

/// Target used for one-line-per-response access records.
pub const ACCESS_TARGET: &str = "access";

/// Filter for diagnostic output: `directives` (usually `RUST_LOG`) or `info`,
/// with the access target always excluded.
///
/// # Errors
///
/// Fails only if the built-in exclusion directive does not parse.
pub fn diagnostics_filter(directives: Option<&str>) -> Result<EnvFilter, ParseError> {
    let filter = directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    let exclude: Directive = format!("{ACCESS_TARGET}=off").parse()?;
    Ok(filter.add_directive(exclude))
}

/// Layer printing access records as bare lines to `writer`.
pub fn access_layer<S, W>(writer: W) -> impl tracing_subscriber::Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(Targets::new().with_target(ACCESS_TARGET, Level::INFO))
}

/// Installs the global subscriber, reading diagnostics directives from
/// `RUST_LOG`.
///
/// # Errors
///
/// Fails if a global subscriber is already set.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let directives = std::env::var("RUST_LOG").ok();
    let diagnostics = fmt::layer()
        .with_target(false)
        .with_filter(diagnostics_filter(directives.as_deref())?);

    tracing_subscriber::registry()
        .with(diagnostics)
        .with(access_layer(std::io::stdout))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::{info, warn};

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_with(directives: &str) -> (Capture, Capture) {
        let access = Capture::default();
        let diagnostics = Capture::default();
        let (a, d) = (access.clone(), diagnostics.clone());

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .without_time()
                    .with_ansi(false)
                    .with_writer(move || d.clone())
                    .with_filter(diagnostics_filter(Some(directives)).unwrap()),
            )
            .with(access_layer(move || a.clone()));

        tracing::subscriber::with_default(subscriber, || {
            info!(target: ACCESS_TARGET, "[Sun, 18 Oct 2026 10:00:00 GMT] 10.0.0.1 GET /a.txt 200 OK");
            info!("serving files");
            warn!("rate limit exceeded");
        });
        (access, diagnostics)
    }

    #[test]
    fn access_lines_are_bare() {
        let (access, diagnostics) = capture_with("info");
        assert_eq!(
            access.text(),
            "[Sun, 18 Oct 2026 10:00:00 GMT] 10.0.0.1 GET /a.txt 200 OK\n"
        );
        let diag = diagnostics.text();
        assert!(diag.contains("serving files"));
        assert!(diag.contains("rate limit exceeded"));
        assert!(!diag.contains("/a.txt"));
    }

    #[test]
    fn access_lines_survive_a_quiet_filter() {
        let (access, diagnostics) = capture_with("warn");
        assert!(access.text().ends_with("GET /a.txt 200 OK\n"));
        let diag = diagnostics.text();
        assert!(!diag.contains("serving files"));
        assert!(diag.contains("rate limit exceeded"));
    }
}
