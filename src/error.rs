//! Rejection taxonomy and HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::store::{QueueError, StoreError};

/// Errors surfaced synchronously to the sending platform.
///
/// Everything here maps to a 4xx/5xx and is never retried internally; the
/// provider's own retry mechanism is the recovery path. Failures *after*
/// successful verification (persistence, queue handoff) are deliberately not
/// represented — those are recovered locally and the request still
/// acknowledges 200 (see the orchestrator).
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("unknown connector: {0}")]
    UnknownConnector(String),

    #[error("empty request body")]
    EmptyBody,

    #[error("organization could not be resolved")]
    MissingOrg,

    #[error("no connection registered for shop: {0}")]
    UnknownShop(String),

    #[error("no webhook endpoint configured for this organization")]
    EndpointNotFound,

    #[error("webhook endpoint is disabled")]
    EndpointDisabled,

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("payload could not be parsed: {0}")]
    InvalidPayload(String),

    #[error("secret not configured: {0}")]
    ConfigurationError(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// JSON error body returned for rejections.
#[derive(Debug, Clone, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IngestError {
    /// Stable machine-readable code for the rejection.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownConnector(_) => "UNKNOWN_CONNECTOR",
            Self::EmptyBody => "EMPTY_BODY",
            Self::MissingOrg => "MISSING_ORG",
            Self::UnknownShop(_) => "UNKNOWN_SHOP",
            Self::EndpointNotFound => "ENDPOINT_NOT_FOUND",
            Self::EndpointDisabled => "ENDPOINT_DISABLED",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::ConfigurationError(_) => "CONFIGURATION_ERROR",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::UnknownConnector(_) | Self::UnknownShop(_) | Self::EndpointNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::EmptyBody | Self::MissingOrg | Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::EndpointDisabled => StatusCode::FORBIDDEN,
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::ConfigurationError(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Do not leak internals to the caller for server-side faults.
            Self::ConfigurationError(_) | Self::Store(_) => {
                tracing::error!(error = %self, "ingestion rejected by server-side fault");
                None
            }
            other => Some(other.to_string()),
        };
        let body = ErrorBody {
            error: self.code(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<QueueError> for IngestError {
    fn from(err: QueueError) -> Self {
        // Queue errors only reach the caller when they occur before any
        // persistence, which the orchestrator never allows; treat as a
        // server-side fault if it happens.
        Self::Store(StoreError::Unavailable(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(IngestError::EmptyBody.code(), "EMPTY_BODY");
        assert_eq!(IngestError::InvalidSignature.code(), "INVALID_SIGNATURE");
        assert_eq!(
            IngestError::UnknownConnector("x".into()).code(),
            "UNKNOWN_CONNECTOR"
        );
        assert_eq!(
            IngestError::ConfigurationError("s".into()).code(),
            "CONFIGURATION_ERROR"
        );
    }

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(IngestError::InvalidSignature.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(IngestError::EndpointDisabled.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            IngestError::UnknownShop("a.myshopify.com".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            IngestError::ConfigurationError("secret".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
