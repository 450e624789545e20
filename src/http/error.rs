//! Typed errors for HTTP responses from the provider's API.

use std::convert::TryFrom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    BadGateway,
    Unknown,
}

impl ApiErrorKind {
    pub fn from_code(code: u16) -> Self {
        match code {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            502 => Self::BadGateway,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub code: u16,
    pub message: String,
}

const UNKNOWN_ERROR: &str = "Unknown error";

/// Maps an error response to an [`ApiError`].
///
/// A JSON body may override the message (`message`, then `error_message`) and
/// the code (`code`, then `error_code`). Anything else keeps the HTTP status and
/// a generic message.
pub fn classify(status: u16, body: &[u8]) -> ApiError {
    let mut code = status;
    let mut message = UNKNOWN_ERROR.to_string();

    if let Ok(serde_json::Value::Object(json)) = serde_json::from_slice(body) {
        let text = |key: &str| match json.get(key) {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        let number = |key: &str| match json.get(key) {
            Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        };

        if let Some(m) = text("message").or_else(|| text("error_message")) {
            message = m;
        }
        if let Some(c) = number("code").or_else(|| number("error_code")) {
            code = c;
        }
    }

    ApiError {
        kind: ApiErrorKind::from_code(code),
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_json_body_keeps_status() {
        let err = classify(404, b"<html>not here</html>");
        assert_eq!(err.kind, ApiErrorKind::NotFound);
        assert_eq!(err.code, 404);
        assert_eq!(err.message, "Unknown error");
    }

    #[test]
    fn json_message_and_code_override() {
        let err = classify(400, br#"{"message": "slow down", "code": 429}"#);
        assert_eq!(err.kind, ApiErrorKind::RateLimited);
        assert_eq!(err.code, 429);
        assert_eq!(err.message, "slow down");
    }

    #[test]
    fn error_prefixed_fields_are_fallbacks() {
        let err = classify(500, br#"{"error_message": "bad token", "error_code": "401"}"#);
        assert_eq!(err.kind, ApiErrorKind::Unauthorized);
        assert_eq!(err.code, 401);
        assert_eq!(err.message, "bad token");

        let err = classify(
            500,
            br#"{"message": "first", "error_message": "second", "code": 403, "error_code": 404}"#,
        );
        assert_eq!(err.message, "first");
        assert_eq!(err.code, 403);
    }

    #[test]
    fn json_without_fields_is_generic() {
        let err = classify(502, br#"{"detail": "upstream"}"#);
        assert_eq!(err.kind, ApiErrorKind::BadGateway);
        assert_eq!(err.message, "Unknown error");
    }

    #[test]
    fn unmapped_status_is_unknown() {
        let err = classify(418, b"");
        assert_eq!(err.kind, ApiErrorKind::Unknown);
        assert_eq!(err.code, 418);
    }
}
