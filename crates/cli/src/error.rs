//! CLI-level error type wrapping I/O, parse, and core simulation failures.
//!
//! Matches `fire-sim-core`'s hand-rolled `FatalError`/`SimError` style: a
//! plain enum with manual `Display`/`Error`, no `thiserror`/`anyhow`. `main`
//! is the only place these get converted to a process exit code.

use std::fmt;
use std::path::PathBuf;

use fire_sim_core::{FatalError, SimError};

#[derive(Debug)]
pub enum CliError {
    /// A file could not be opened or read.
    Io { path: PathBuf, source: std::io::Error },
    /// A settings.ini, weather CSV, or raster file was malformed.
    Parse(String),
    /// The simulation core raised a fatal or recoverable error.
    Sim(SimError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            CliError::Parse(msg) => write!(f, "{msg}"),
            CliError::Sim(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io { source, .. } => Some(source),
            CliError::Parse(_) => None,
            CliError::Sim(e) => Some(e),
        }
    }
}

impl From<SimError> for CliError {
    fn from(e: SimError) -> Self {
        CliError::Sim(e)
    }
}

impl From<FatalError> for CliError {
    fn from(e: FatalError) -> Self {
        CliError::Sim(e.into())
    }
}

pub trait IoContext<T> {
    /// Attach `path` to an `io::Result` so the error message names the file
    /// that failed, not just "No such file or directory".
    fn with_path(self, path: &std::path::Path) -> Result<T, CliError>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn with_path(self, path: &std::path::Path) -> Result<T, CliError> {
        self.map_err(|source| CliError::Io { path: path.to_path_buf(), source })
    }
}
