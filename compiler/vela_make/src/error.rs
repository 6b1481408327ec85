//! Recoverable failures of the planner itself.
//!
//! Only I/O-level problems live here: a module that fails to *compile* is
//! data (`BuildResult::Failed`), not an error, and invariant violations
//! (double result writes, lookups of unplanned modules) abort the run with a
//! panic rather than surface as a value.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use vela_externs::ModuleName;

/// An I/O or encoding failure while planning or persisting build state.
#[derive(Debug, Error)]
pub enum MakeError {
    /// No source file is registered for a module in the sorted list.
    #[error("module {0} has no registered source file")]
    UnknownModule(ModuleName),

    /// Reading or stat-ing a module's input source failed.
    #[error("failed to fingerprint input {path} for module {module}: {source}")]
    InputFingerprint {
        module: ModuleName,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The cache database file could not be read.
    #[error("failed to read build cache database at {path}: {source}")]
    CacheRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The cache database file could not be written.
    #[error("failed to write build cache database at {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The cache database file exists but does not decode.
    #[error("build cache database at {path} is corrupt: {source}")]
    CacheDecode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    /// The cache database failed to encode.
    #[error("failed to encode build cache database: {0}")]
    CacheEncode(#[source] bincode::Error),

    /// An externs artifact could not be written.
    #[error("failed to write externs for module {module}: {source}")]
    ExternsWrite {
        module: ModuleName,
        #[source]
        source: io::Error,
    },

    /// An externs artifact failed to encode.
    #[error("failed to encode externs for module {module}: {source}")]
    ExternsEncode {
        module: ModuleName,
        #[source]
        source: bincode::Error,
    },
}
