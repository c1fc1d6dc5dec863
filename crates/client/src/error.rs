//! Client error taxonomy.

use thiserror::Error;

/// Errors surfaced by the Campus client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Builder misuse or otherwise unusable configuration.
    #[error("invalid client configuration: {0}")]
    Configuration(String),

    /// The request never reached the server or the response never arrived
    /// (timeout, DNS, offline). Never retried by the client.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response, other than an auth expiry resolved by the refresh
    /// path.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Login rejected by the backend.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The refresh exchange failed and the session has been cleared. The
    /// caller must re-authenticate; this is not a retryable error.
    #[error("session expired, authentication required")]
    AuthExpired,

    /// A local precondition failed before any network call was made.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Map a non-success status and raw body to an error, preferring the
    /// server's conventional `detail`/`message` fields over the
    /// status-keyed fallback.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message =
            extract_message(body).unwrap_or_else(|| fallback_message(status).to_string());
        Self::Http {
            status: status.as_u16(),
            message,
        }
    }

    /// HTTP status carried by this error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is a 401 that may be resolved by a token refresh.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// Whether the session is gone and the user must log in again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["detail", "message"] {
        if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
            return Some(message.to_string());
        }
    }
    None
}

fn fallback_message(status: reqwest::StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "Bad request",
        401 => "Authentication required",
        403 => "Permission denied",
        404 => "Not found",
        409 => "Conflict",
        500..=599 => "Server error",
        _ => "Request failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn prefers_server_detail_field() {
        let err = ClientError::from_status(
            StatusCode::NOT_FOUND,
            r#"{"detail": "Course not found or access denied"}"#,
        );
        assert_eq!(err.to_string(), "Course not found or access denied");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn falls_back_to_message_field() {
        let err = ClientError::from_status(StatusCode::BAD_REQUEST, r#"{"message": "nope"}"#);
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn non_json_body_uses_status_fallback() {
        let err = ClientError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert_eq!(err.to_string(), "Server error");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn unauthorized_predicate_only_matches_http_401() {
        assert!(ClientError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(!ClientError::AuthExpired.is_unauthorized());
        assert!(ClientError::AuthExpired.is_auth_expired());
        assert!(!ClientError::from_status(StatusCode::FORBIDDEN, "").is_unauthorized());
    }
}
