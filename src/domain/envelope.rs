//! Backend response envelope
//!
//! Every backend endpoint answers with `{ code, message, data }`:
//! - `code == 0` - success, `data` carries the payload
//! - `code == 3999` - the session is no longer valid
//! - any other code - business-rule rejection, `message` is user-facing

use serde::{Deserialize, Deserializer, Serialize};

/// Envelope code for a successful call
pub const SUCCESS_CODE: i64 = 0;

/// Envelope code reserved for "session invalid, log in again"
pub const FORBIDDEN_CODE: i64 = 3999;

/// Uniform wrapper around every backend response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default)]
    pub data: T,
}

/// How an envelope code should be handled by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStatus {
    Success,
    Forbidden,
    Rejected,
}

impl EnvelopeStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            SUCCESS_CODE => EnvelopeStatus::Success,
            FORBIDDEN_CODE => EnvelopeStatus::Forbidden,
            _ => EnvelopeStatus::Rejected,
        }
    }
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { code: SUCCESS_CODE, message: String::from("ok"), data }
    }

    pub fn status(&self) -> EnvelopeStatus {
        EnvelopeStatus::from_code(self.code)
    }
}

impl Envelope<serde_json::Value> {
    /// Failure envelope with a null payload
    pub fn error(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: serde_json::Value::Null }
    }
}

/// `"message": null` reads as an empty message
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Loosely-typed view of an error response body.
///
/// Non-2xx bodies may or may not follow the envelope shape, so every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Parse an error body, returning `None` for anything that is not a JSON object
    pub fn parse(body: &[u8]) -> Option<Self> {
        if body.is_empty() {
            return None;
        }
        serde_json::from_slice::<ErrorBody>(body).ok()
    }

    /// The body's message if it carries a non-empty one
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }

    pub fn is_forbidden(&self) -> bool {
        self.code == Some(FORBIDDEN_CODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_code() {
        assert_eq!(EnvelopeStatus::from_code(0), EnvelopeStatus::Success);
        assert_eq!(EnvelopeStatus::from_code(3999), EnvelopeStatus::Forbidden);
        assert_eq!(EnvelopeStatus::from_code(1001), EnvelopeStatus::Rejected);
        assert_eq!(EnvelopeStatus::from_code(-1), EnvelopeStatus::Rejected);
    }

    #[test]
    fn test_envelope_missing_message_defaults() {
        let env: Envelope<Vec<i32>> = serde_json::from_str(r#"{"code":0,"data":[1,2]}"#).unwrap();
        assert_eq!(env.message, "");
        assert_eq!(env.data, vec![1, 2]);
        assert_eq!(env.status(), EnvelopeStatus::Success);
    }

    #[test]
    fn test_envelope_missing_data_is_null_for_value() {
        let env: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"code":1001,"message":"库存不足"}"#).unwrap();
        assert!(env.data.is_null());
        assert_eq!(env.message, "库存不足");
    }

    #[test]
    fn test_envelope_null_message_is_empty() {
        let env: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"code":1001,"message":null,"data":null}"#).unwrap();
        assert_eq!(env.message, "");
        assert_eq!(env.status(), EnvelopeStatus::Rejected);
    }

    #[test]
    fn test_error_body_parse() {
        let body = ErrorBody::parse(br#"{"message":"server exploded"}"#).unwrap();
        assert_eq!(body.message(), Some("server exploded"));
        assert!(!body.is_forbidden());

        let forbidden = ErrorBody::parse(br#"{"code":3999}"#).unwrap();
        assert!(forbidden.is_forbidden());
        assert_eq!(forbidden.message(), None);

        assert!(ErrorBody::parse(b"").is_none());
        assert!(ErrorBody::parse(b"<html>bad gateway</html>").is_none());
    }

    #[test]
    fn test_error_body_blank_message_ignored() {
        let body = ErrorBody::parse(br#"{"message":"  "}"#).unwrap();
        assert_eq!(body.message(), None);
    }
}
