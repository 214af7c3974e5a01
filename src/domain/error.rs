//! Failures surfaced by the API client

use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Every failed call ends in exactly one of these.
///
/// By the time a caller sees one, the notifier has already been told; callers
/// only need to react (stop a spinner, exit non-zero), not re-announce it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Session is invalid; teardown and redirect already ran
    #[error("Unauthorized")]
    Unauthorized,

    /// Business rule rejected the request (envelope code != 0)
    #[error("{message}")]
    Domain { code: i64, message: String },

    /// Network fault, timeout, or server error without a usable envelope
    #[error("{message}")]
    Transport { status: Option<u16>, message: String },
}

impl ApiError {
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        ApiError::Transport { status, message: message.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::Domain { .. } => "domain",
            ApiError::Transport { .. } => "transport",
        }
    }
}
