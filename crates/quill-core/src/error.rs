use thiserror::Error;

/// Top-level error type for Quill.
#[derive(Debug, Error)]
pub enum QuillError {
    /// Error from the semantic Oracle (unreachable, or malformed payload).
    #[error("oracle error: {0}")]
    Oracle(String),

    /// Storage read/write error.
    #[error("storage error: {0}")]
    Storage(String),

    /// A conditional single-row write found the row already changed or gone.
    #[error("storage conflict: {0}")]
    StorageConflict(String),

    /// A schedule row carries an unusable timezone or time-of-day.
    #[error("schedule config error: {0}")]
    ScheduleConfig(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
