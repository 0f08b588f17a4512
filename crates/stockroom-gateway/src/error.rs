use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use stockroom_rag::RagError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),
    #[error("server error: {0}")]
    Server(String),
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Error side of every handler.
#[derive(Debug)]
pub(crate) enum ApiError {
    Rag(RagError),
    /// The request body could not be read as the expected JSON.
    Body(JsonRejection),
}

impl From<RagError> for ApiError {
    fn from(e: RagError) -> Self {
        Self::Rag(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::Body(e)
    }
}

pub(crate) fn status_for(err: &RagError) -> StatusCode {
    match err {
        RagError::Validation(_) => StatusCode::BAD_REQUEST,
        RagError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        RagError::RefreshInProgress => StatusCode::CONFLICT,
        RagError::Upstream(_) | RagError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        RagError::CatalogRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Rag(e) => {
                let status = status_for(&e);
                if status.is_server_error() {
                    tracing::error!(kind = e.kind(), "request failed: {e}");
                } else {
                    tracing::debug!(kind = e.kind(), "request rejected: {e}");
                }
                (
                    status,
                    ErrorBody {
                        error: e.kind(),
                        message: e.to_string(),
                    },
                )
            }
            Self::Body(rejection) => {
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    (
                        StatusCode::PAYLOAD_TOO_LARGE,
                        ErrorBody {
                            error: "payload_too_large",
                            message: rejection.body_text(),
                        },
                    )
                } else {
                    (
                        StatusCode::BAD_REQUEST,
                        ErrorBody {
                            error: "validation",
                            message: rejection.body_text(),
                        },
                    )
                }
            }
        };
        (status, Json(body)).into_response()
    }
}
