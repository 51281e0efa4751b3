use callboard_core::import::ProgressSnapshot;

/// Errors raised while admitting or running an import job.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The uploaded file could not be decoded as a workbook.
    #[error("Failed to read workbook: {0}")]
    Workbook(String),

    /// A persistence call failed.
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Another job holds the single import slot. Carries its snapshot.
    #[error("An import is already in progress")]
    AlreadyRunning(Box<ProgressSnapshot>),

    #[error("Internal error: {0}")]
    Internal(String),
}
