//! Error types for the cloner.
//!
//! Nothing inside [`Cloner::clone_var`](crate::Cloner::clone_var) returns an
//! error. Limits degrade into cut counts and failing casters degrade into
//! stub attributes. Only configuration can fail.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or loading a cloner configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A limit was negative and not the `-1` "unlimited" sentinel.
    #[error("invalid {name}: {value} (expected a non-negative integer or -1 for unlimited)")]
    NegativeLimit { name: &'static str, value: i64 },

    /// A configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration document could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure reported by a caster transform.
///
/// The cloner never propagates this; it falls back to the value's intrinsic
/// children and records the failure on the stub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CasterError {
    /// The transform gave up on the value.
    #[error("{0}")]
    Failed(String),

    /// The transform panicked.
    #[error("caster panicked: {0}")]
    Panicked(String),
}

impl CasterError {
    /// Shorthand for [`CasterError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        CasterError::Failed(message.into())
    }
}

/// A snapshot whose indices do not describe a finite, well-formed table.
///
/// Only snapshots built outside the cloner (deserialized ones, for instance)
/// can fail [`Snapshot::validate`](crate::Snapshot::validate).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    /// A stub at `depth` keeps its children anywhere but bucket `depth`.
    #[error("stub at depth {depth} has its children in bucket {target}, expected bucket {depth}")]
    MisplacedRow { depth: usize, target: usize },

    /// A stub or definition points at a row that does not exist.
    #[error("no row at bucket {bucket}, row {row}")]
    MissingRow { bucket: usize, row: usize },

    /// A stub carries a handle with no definition slot.
    #[error("handle {0} has no definition")]
    UnknownHandle(u32),
}

/// Result type for configuration operations.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
