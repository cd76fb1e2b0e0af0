//! Logging setup.
//!
//! `RUST_LOG` takes precedence over the filter passed in. Output goes to
//! stderr, or to a file when one is given so the terminal UI keeps the
//! screen to itself.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::{Mutex, Once};

use tracing_subscriber::EnvFilter;

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber. Later calls are no-ops.
pub fn init(filter: &str, log_file: Option<&Path>) -> io::Result<()> {
    let file = match log_file {
        Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
        None => None,
    };

    INIT_ONCE.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
        let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

        // another subscriber may already be installed, e.g. by a test harness
        let _ = match file {
            Some(file) => builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init(),
            None => builder.with_writer(io::stderr).try_init(),
        };
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabletalk.log");
        init("debug", Some(path.as_path())).unwrap();
        init("debug", None).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.log");
        assert!(init("info", Some(path.as_path())).is_err());
    }
}
