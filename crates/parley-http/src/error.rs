//! HTTP client errors

use parley_core::ModelError;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use validator::ValidationErrors;

/// Error body the API returns for failed requests
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u64,
    #[serde(default)]
    pub message: String,
    /// Field level details, kept raw
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

impl ApiErrorBody {
    /// Parse a body, falling back to the raw text as the message
    pub fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_else(|_| Self {
            code: 0,
            message: String::from_utf8_lossy(body).into_owned(),
            errors: None,
        })
    }
}

/// HTTP client errors
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Improper token has been passed")]
    Unauthorized,

    #[error("Forbidden (error code: {code}): {message}")]
    Forbidden { code: u64, message: String },

    #[error("Not found (error code: {code}): {message}")]
    NotFound { code: u64, message: String },

    #[error("Rate limited; retry after {retry_after:?} (global: {global})")]
    RateLimited { retry_after: Duration, global: bool },

    #[error("Server error: {status}")]
    ServerError { status: u16 },

    #[error("{status} (error code: {code}): {message}")]
    Api {
        status: u16,
        code: u64,
        message: String,
    },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl HttpError {
    /// Build the error for a non-success status
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let body = ApiErrorBody::parse(body);
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden {
                code: body.code,
                message: body.message,
            },
            404 => Self::NotFound {
                code: body.code,
                message: body.message,
            },
            500..=599 => Self::ServerError { status },
            _ => Self::Api {
                status,
                code: body.code,
                message: body.message,
            },
        }
    }

    /// HTTP status, when the error came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::ServerError { status } | Self::Api { status, .. } => Some(*status),
            Self::Request(err) => err.status().map(|s| s.as_u16()),
            Self::Json(_) | Self::Validation(_) | Self::Model(_) => None,
        }
    }

    /// Platform JSON error code, when one was returned
    pub fn code(&self) -> Option<u64> {
        match self {
            Self::Forbidden { code, .. } | Self::NotFound { code, .. } | Self::Api { code, .. } => {
                Some(*code)
            }
            _ => None,
        }
    }

    /// Whether retrying the same request later could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::ServerError { .. } => true,
            Self::Request(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for HTTP operations
pub type HttpResult<T> = Result<T, HttpError>;
