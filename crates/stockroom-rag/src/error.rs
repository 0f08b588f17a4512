//! Error types for stockroom-rag.

use stockroom_catalog::CatalogError;
use stockroom_llm::LlmError;

/// Errors surfaced by index builds and the query path.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// No snapshot is published.
    #[error("embeddings not initialized, refresh embeddings first")]
    NotReady,

    /// Another refresh holds the build slot.
    #[error("an embeddings refresh is already in progress")]
    RefreshInProgress,

    /// Embedding or generation call failed.
    #[error("upstream service error: {0}")]
    Upstream(#[from] LlmError),

    /// A remote service answered with something that does not fit the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Caller input rejected before any remote call.
    #[error("{0}")]
    Validation(String),

    /// Reading records from the catalog failed.
    #[error("catalog read failed: {0}")]
    CatalogRead(#[from] CatalogError),
}

impl RagError {
    /// Stable tag for error responses.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotReady => "not_ready",
            Self::RefreshInProgress => "refresh_in_progress",
            Self::Upstream(_) => "upstream_service",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Validation(_) => "validation",
            Self::CatalogRead(_) => "catalog_read",
        }
    }
}

/// Result type alias using `RagError`.
pub type Result<T> = std::result::Result<T, RagError>;
