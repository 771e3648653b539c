use thiserror::Error;

/// Domain error taxonomy. Boundary code strings live in `code()` so the
/// IPC layer never matches on variants directly.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    ValidationMismatch(String),

    #[error("upstream fetch failed: {0}")]
    UpstreamUnavailable(String),

    #[error("render failed: {0}")]
    RenderFailure(String),

    #[error("store failure: {0}")]
    Store(#[from] rusqlite::Error),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DomainError::NotFound(what.into())
    }

    pub fn mismatch(message: impl Into<String>) -> Self {
        DomainError::ValidationMismatch(message.into())
    }

    pub fn render(message: impl Into<String>) -> Self {
        DomainError::RenderFailure(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "not_found",
            DomainError::ValidationMismatch(_) => "validation_mismatch",
            DomainError::UpstreamUnavailable(_) => "upstream_unavailable",
            DomainError::RenderFailure(_) => "render_failed",
            DomainError::Store(_) => "db_query_failed",
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
