//! Request/response interceptor pipeline
//!
//! Pure functions only. `authorize` decorates an outgoing request; the
//! `interpret_*` functions turn whatever came back into a `Verdict`. The
//! client applies the side effects a rejected verdict asks for.
//!
//! Classification order for a received response:
//! 1. non-2xx: message from the error body, else the status line, teardown on
//!    401 or a forbidden code in the body
//! 2. 2xx that is not an envelope: invalid response
//! 3. `code == 3999`: unauthorized, teardown
//! 4. `code != 0`: domain error carrying the server's message
//! 5. otherwise success

use crate::domain::envelope::{Envelope, EnvelopeStatus, ErrorBody};
use crate::domain::error::ApiError;
use crate::io::notify::Notification;
use crate::io::transport::{ApiRequest, NetworkFailure, RawResponse};

pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Route the navigator is sent to when the session is torn down
pub const LOGIN_ROUTE: &str = "/login";

/// Used when neither the body nor the transport produced a message
pub const FALLBACK_MESSAGE: &str = "request failed";

pub const ERROR_TITLE: &str = "Error";
pub const UNAUTHORIZED_TITLE: &str = "Unauthorized";
pub const UNAUTHORIZED_DESCRIPTION: &str = "Please log in again";

/// A failed call: what to return, what to show, whether to end the session
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub error: ApiError,
    pub notice: Notification,
    pub teardown: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Success(Envelope<serde_json::Value>),
    Rejected(Failure),
}

/// Attach `Authorization: Bearer <token>` when a token is present
pub fn authorize(mut request: ApiRequest, token: Option<&str>) -> ApiRequest {
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        request.set_header(AUTHORIZATION_HEADER, format!("Bearer {}", token));
    }
    request
}

/// Classify a response that made it back over the wire
pub fn interpret_response(response: &RawResponse) -> Verdict {
    if !response.is_success() {
        return Verdict::Rejected(error_status_failure(response.status, &response.body));
    }

    let envelope: Envelope<serde_json::Value> = match serde_json::from_slice(&response.body) {
        Ok(envelope) => envelope,
        Err(e) => return Verdict::Rejected(invalid_response(response.status, &e)),
    };

    match envelope.status() {
        EnvelopeStatus::Success => Verdict::Success(envelope),
        EnvelopeStatus::Forbidden => Verdict::Rejected(forbidden()),
        EnvelopeStatus::Rejected => {
            let message = non_blank(&envelope.message).unwrap_or(FALLBACK_MESSAGE).to_string();
            Verdict::Rejected(Failure {
                notice: Notification::error(ERROR_TITLE, message.as_str()),
                error: ApiError::Domain { code: envelope.code, message },
                teardown: false,
            })
        }
    }
}

/// Classify a call that never produced a response
pub fn interpret_network_failure(failure: &NetworkFailure) -> Verdict {
    let message = non_blank(&failure.message).unwrap_or(FALLBACK_MESSAGE).to_string();
    Verdict::Rejected(Failure {
        notice: Notification::error(ERROR_TITLE, message.as_str()),
        error: ApiError::Transport { status: None, message },
        teardown: false,
    })
}

/// A 2xx whose body or payload could not be decoded
pub fn invalid_response(status: u16, detail: &dyn std::fmt::Display) -> Failure {
    let message = format!("invalid response: {}", detail);
    Failure {
        notice: Notification::error(ERROR_TITLE, message.as_str()),
        error: ApiError::Transport { status: Some(status), message },
        teardown: false,
    }
}

/// A call that failed on this side of the wire (encoding, local storage)
pub fn local_failure(message: impl Into<String>) -> Failure {
    let message = message.into();
    Failure {
        notice: Notification::error(ERROR_TITLE, message.as_str()),
        error: ApiError::Transport { status: None, message },
        teardown: false,
    }
}

fn forbidden() -> Failure {
    Failure {
        error: ApiError::Unauthorized,
        notice: Notification::error(UNAUTHORIZED_TITLE, UNAUTHORIZED_DESCRIPTION),
        teardown: true,
    }
}

fn error_status_failure(status: u16, body: &[u8]) -> Failure {
    let parsed = ErrorBody::parse(body);
    let message = parsed
        .as_ref()
        .and_then(ErrorBody::message)
        .map(str::to_string)
        .unwrap_or_else(|| format!("request failed with status code {}", status));
    let teardown = status == 401 || parsed.as_ref().is_some_and(ErrorBody::is_forbidden);

    let error = if teardown {
        ApiError::Unauthorized
    } else {
        ApiError::Transport { status: Some(status), message: message.clone() }
    };
    Failure { error, notice: Notification::error(ERROR_TITLE, message), teardown }
}

fn non_blank(s: &str) -> Option<&str> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
