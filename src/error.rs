//! Error taxonomy for a duplicate search.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while searching for duplicates.
#[derive(Debug, Error)]
pub enum DupError {
    /// A file could not be opened or read while fingerprinting it.
    ///
    /// The hash stage recovers from this by moving the file to the skip list.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A result was requested before the stage producing it has run.
    #[error("invalid state: {0}")]
    State(String),

    /// The search configuration is unusable (bad root path).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The cancellation flag was raised between two file reads.
    #[error("search cancelled")]
    Cancelled,
}

impl DupError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DupError>;
