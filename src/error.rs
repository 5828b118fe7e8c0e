//! Sluicegate error types

/// Sluicegate error types
#[derive(Debug, thiserror::Error)]
pub enum SluiceError {
    // Source errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source error: {0}")]
    Source(String),

    /// The source dropped a [`ReadCompletion`](crate::source::ReadCompletion)
    /// without resolving it.
    #[error("read abandoned by source before completion")]
    ReadAbandoned,

    /// The source reported more bytes than the transport buffer holds.
    #[error("source reported {count} bytes read into a {capacity}-byte transport buffer")]
    InvalidReadCount { count: usize, capacity: usize },

    #[error("source already closed")]
    SourceClosed,

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for sluicegate operations
pub type Result<T> = std::result::Result<T, SluiceError>;
