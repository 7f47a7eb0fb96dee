use std::path::PathBuf;
use thiserror::Error;

use crate::{selector::SelectionPolicy, transfer::TransferState};

/// Why a transfer stopped before completing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The caller's cancellation token fired between two chunks.
    Cancelled,
    /// Reading the destination or writing a chunk failed.
    Io(String),
    /// The source could not be opened or broke mid-stream.
    Source(String),
    /// The source ended before the declared total was reached.
    UnexpectedEof { expected: u64, received: u64 },
    /// The destination (or the source) holds more bytes than declared.
    SizeMismatch { expected: u64, found: u64 },
}

impl FailureReason {
    /// Whether re-invoking the transfer (and resuming) can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureReason::Io(_) | FailureReason::Source(_) | FailureReason::UnexpectedEof { .. }
        )
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Cancelled => write!(f, "cancelled"),
            FailureReason::Io(msg) => write!(f, "io error: {msg}"),
            FailureReason::Source(msg) => write!(f, "source error: {msg}"),
            FailureReason::UnexpectedEof { expected, received } => write!(
                f,
                "stream ended early: received {received} of {expected} bytes"
            ),
            FailureReason::SizeMismatch { expected, found } => {
                write!(f, "size mismatch: expected {expected} bytes, found {found}")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum TubefetchError {
    #[error("Invalid variant {id:?}: {reason}")]
    InvalidVariant { id: String, reason: String },

    #[error("No stream matches policy {policy}")]
    NoMatchingStream { policy: SelectionPolicy },

    #[error(
        "Cannot resume {}: {existing_bytes} bytes already present but the source does not support range requests",
        .path.display()
    )]
    ResumeUnsupported { path: PathBuf, existing_bytes: u64 },

    #[error(
        "Transfer to {} failed after {} bytes: {reason}",
        .state.destination.display(),
        .state.bytes_transferred
    )]
    Transfer {
        reason: FailureReason,
        state: Box<TransferState>,
    },

    #[error("Unknown selection policy {0:?} (expected \"audio\", \"highest\" or a resolution like \"720p\")")]
    UnknownPolicy(String),

    #[error("Metadata resolution failed for {input}: {reason}")]
    ResolveFailed { input: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Connector setup failed: {0}")]
    ConnectorError(#[from] crate::source::SourceError),
}

pub type Result<T> = std::result::Result<T, TubefetchError>;
