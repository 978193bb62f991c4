//! Error taxonomy for document operations.
//!
//! Messages are written for the caller that has to retry: they carry the
//! offending index, the valid bound, or the token that broke parsing.

use thiserror::Error;

/// Errors that can occur while planning or executing document edits.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DocError {
    /// A row, column, or table index outside the live structure.
    #[error("{what} {index} is out of range (valid range: [0, {len}))")]
    OutOfBounds {
        /// What was indexed: "row", "column", "table", ...
        what: &'static str,
        /// The index that was requested.
        index: usize,
        /// Exclusive upper bound.
        len: usize,
    },

    /// A referenced document, table, or snapshot does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The intermediate-format input is structurally invalid.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// Too many chained table passes for one write.
    #[error(
        "content requires more than {depth} table passes; simplify the document or split it into several writes"
    )]
    RecursionLimit {
        /// The pass limit that was hit.
        depth: usize,
    },

    /// A single remote call failed.
    #[error("remote call failed{}: {message}", http_suffix(.status))]
    Remote {
        message: String,
        status: Option<u16>,
    },

    /// Undo or redo with nothing on the respective stack.
    #[error("nothing to {stack} for document {document_id}")]
    EmptyHistory {
        /// "undo" or "redo".
        stack: &'static str,
        document_id: String,
    },

    /// Malformed tool or request parameters.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

impl DocError {
    /// Create an OutOfBounds error.
    pub fn out_of_bounds(what: &'static str, index: usize, len: usize) -> Self {
        Self::OutOfBounds { what, index, len }
    }

    /// Create a Remote error without an HTTP status.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote { message: message.into(), status: None }
    }

    /// Whether the failure came from the remote side rather than the input.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

fn http_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocError>;
