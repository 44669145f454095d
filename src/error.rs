use axum::{
    http::StatusCode,
    response::{ IntoResponse, Response },
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

/// Everything that can end a chat relay exchange early.
///
/// Variants raised before the first chunk is written become a JSON error
/// response. Once the body has started, only `UpstreamInterrupted` can occur
/// and it aborts the body instead.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Request body exceeds the {limit} byte limit")]
    BodyTooLarge {
        limit: usize,
    },

    #[error("Conversation has {count} messages, the limit is {limit}")]
    ConversationTooLong {
        count: usize,
        limit: usize,
    },

    #[error("Upstream rejected the request ({status}): {message}")]
    UpstreamRejected {
        status: u16,
        message: String,
    },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream timed out: {0}")]
    UpstreamTimeout(String),

    #[error("Upstream stream interrupted: {0}")]
    UpstreamInterrupted(String),
}

impl RelayError {
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MalformedRequest(_) => "malformed_request",
            RelayError::BodyTooLarge { .. } => "body_too_large",
            RelayError::ConversationTooLong { .. } => "conversation_too_long",
            RelayError::UpstreamRejected { .. } => "upstream_rejected",
            RelayError::UpstreamUnavailable(_) => "upstream_unavailable",
            RelayError::UpstreamTimeout(_) => "upstream_timeout",
            RelayError::UpstreamInterrupted(_) => "upstream_interrupted",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::BodyTooLarge { .. } | RelayError::ConversationTooLong { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            RelayError::UpstreamRejected { .. }
            | RelayError::UpstreamUnavailable(_)
            | RelayError::UpstreamInterrupted(_) => StatusCode::BAD_GATEWAY,
            RelayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// True when the caller sent something the relay refuses to forward.
    pub fn is_caller_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_status: Option<u16>,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let upstream_status = match &self {
            RelayError::UpstreamRejected { status, .. } => Some(*status),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message: self.to_string(),
                upstream_status,
            },
        };
        (self.status_code(), Json(body)).into_response()
    }
}
