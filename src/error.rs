//! Error type shared by every file operation, plus the optional observer that
//! may watch errors as they are returned.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

/// Errors returned by [`BasicFile`](crate::BasicFile) and the free functions of this crate.
///
/// Every variant that wraps an [`io::Error`] keeps it as its `source`, so callers can
/// still inspect the OS-level cause (`NotFound`, `PermissionDenied`, ...).
#[derive(Debug, Error)]
pub enum FileError {
    /// The provided name cannot be turned into an absolute path.
    #[error("cannot resolve path {path:?}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A descriptor for an existing file could not be obtained.
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file could not be created or truncated.
    #[error("cannot create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Metadata query failed.
    #[error("stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Persisting to stable storage failed, after `attempts` tries.
    #[error("sync {} failed after {attempts} attempt(s): {source}", path.display())]
    Sync {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// Another flush of the same file is already running.
    #[error("{} is locked: a flush is already in progress", path.display())]
    Locked { path: PathBuf },

    /// The operation was attempted after its deadline.
    #[error("{op} on {} timed out", path.display())]
    Timeout { op: &'static str, path: PathBuf },

    /// Any other I/O failure (read, write, remove, rename, chmod...).
    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A bulk transfer stopped early.
    #[error("transfer stopped after {transferred} bytes: {source}")]
    Transfer {
        transferred: u64,
        #[source]
        source: io::Error,
    },

    /// Reserved surface that is not available on this platform.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

impl FileError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        FileError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Returns the underlying OS error, if there is one.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            FileError::Path { source, .. }
            | FileError::Open { source, .. }
            | FileError::Create { source, .. }
            | FileError::Stat { source, .. }
            | FileError::Sync { source, .. }
            | FileError::Io { source, .. }
            | FileError::Transfer { source, .. } => Some(source),
            FileError::Locked { .. } | FileError::Timeout { .. } | FileError::NotImplemented(_) => {
                None
            }
        }
    }

    /// True when the OS reported that the file (or a parent) does not exist.
    pub fn is_not_found(&self) -> bool {
        self.io_error()
            .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, FileError::Locked { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FileError::Timeout { .. })
    }
}

impl From<FileError> for io::Error {
    fn from(err: FileError) -> Self {
        let kind = match &err {
            FileError::Locked { .. } => io::ErrorKind::WouldBlock,
            FileError::Timeout { .. } => io::ErrorKind::TimedOut,
            FileError::NotImplemented(_) => io::ErrorKind::Unsupported,
            other => other
                .io_error()
                .map_or(io::ErrorKind::Other, io::Error::kind),
        };
        io::Error::new(kind, err)
    }
}

/// Watches errors on their way back to the caller.
///
/// An observer never replaces the returned `Result`; it is a diagnostic side channel.
pub trait ErrorObserver: Send + Sync {
    fn observe(&self, op: &'static str, err: &FileError);
}

/// Forwards every observed error to `tracing` at `WARN` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ErrorObserver for TracingObserver {
    fn observe(&self, op: &'static str, err: &FileError) {
        warn!(op, error = %err, "file operation failed");
    }
}
