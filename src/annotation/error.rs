//! Error types for the annotation engine.
//!
//! Recoverable conditions (stale ids, out-of-bounds spans, missing mark
//! support) are handled where they occur and logged. Only failures reported
//! by the host document surface here.

/// Failure reported by an [`AnnotatedDocument`](super::AnnotatedDocument) host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("mark range {from}..{to} is outside the document (size {size})")]
    RangeOutOfBounds { from: usize, to: usize, size: usize },

    #[error("selection {pos} is outside the document (size {size})")]
    SelectionOutOfBounds { pos: usize, size: usize },
}

/// Errors crossing the engine boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Another scan holds the busy flag.
    #[error("a mention scan is already in progress")]
    ScanInProgress,
}

pub type Result<T> = std::result::Result<T, EngineError>;
