/// Error type for running a survey through a backend.
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    /// User cancelled the survey (Ctrl+C, Escape, ...)
    #[error("Survey cancelled by user")]
    Cancelled,

    /// The traversal stands on a question the graph does not have.
    #[error("Question '{0}' does not exist")]
    UnknownQuestion(String),

    /// Backend-specific failure (I/O, terminal gone, ...)
    #[error("Backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl SurveyError {
    /// Create a backend error from any error type.
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        Self::Backend(err.into())
    }

    /// Check if this error represents user cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
