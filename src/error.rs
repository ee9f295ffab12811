//! Unified error types for the ACL subsystem.

use std::path::PathBuf;

use thiserror::Error;

/// A policy document parse error with position information.
///
/// `offset` is the byte offset of the first structural fault in the source
/// text; `line` and `col` are 1-based.
#[derive(Debug, Clone, Error)]
#[error("{line}:{col}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

/// Errors raised while loading or compiling policies.
///
/// Evaluation never produces an error: every denial on the request path is
/// expressed through `allowed = false`.
#[derive(Debug, Error)]
pub enum AclError {
    /// Malformed policy document.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A rule that cannot be indexed (e.g. an empty path pattern).
    #[error("invalid rule in policy '{policy}': {message}")]
    InvalidRule { policy: String, message: String },

    /// Failed to read a policy document from disk.
    #[error("failed to read policy from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Violated internal invariant. Unreachable by construction.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// Result type alias for ACL operations.
pub type Result<T> = std::result::Result<T, AclError>;
