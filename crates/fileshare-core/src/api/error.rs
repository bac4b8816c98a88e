use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error! status: {status}")]
    Http { status: u16, body: String },

    #[error("{0}")]
    AuthExpired(String),

    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("{0}")]
    Operation(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Message fragments the API uses when it rejects an access credential.
const AUTH_EXPIRED_PATTERNS: &[&str] = &[
    "unauthorized",
    "unauthenticated",
    "not authenticated",
    "token expired",
    "token is expired",
    "jwt expired",
    "invalid token",
    "expired token",
];

/// How a server-reported error message should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    AuthExpired,
    Other,
}

impl ErrorClass {
    pub fn of(message: &str) -> Self {
        let lower = message.to_lowercase();
        if AUTH_EXPIRED_PATTERNS.iter().any(|p| lower.contains(p)) {
            ErrorClass::AuthExpired
        } else {
            ErrorClass::Other
        }
    }
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        ApiError::Http {
            status: status.as_u16(),
            body: Self::truncate_body(body),
        }
    }

    /// Build the error for a message reported in a response envelope.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match ErrorClass::of(&message) {
            ErrorClass::AuthExpired => ApiError::AuthExpired(message),
            ErrorClass::Other => ApiError::Operation(message),
        }
    }

    /// True when the server rejected the access credential and a refresh may help.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            ApiError::AuthExpired(_) | ApiError::Http { status: 401, .. }
        )
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_messages() {
        assert_eq!(ErrorClass::of("Unauthorized"), ErrorClass::AuthExpired);
        assert_eq!(ErrorClass::of("token is expired"), ErrorClass::AuthExpired);
        assert_eq!(ErrorClass::of("JWT expired at 12:00"), ErrorClass::AuthExpired);
        assert_eq!(ErrorClass::of("Invalid token signature"), ErrorClass::AuthExpired);

        assert_eq!(ErrorClass::of("File not found"), ErrorClass::Other);
        assert_eq!(ErrorClass::of("email already registered"), ErrorClass::Other);
    }

    #[test]
    fn test_from_message() {
        assert!(ApiError::from_message("Unauthenticated").is_auth_expired());
        let err = ApiError::from_message("invalid credentials");
        assert!(!err.is_auth_expired());
        assert_eq!(err.to_string(), "invalid credentials");
    }

    #[test]
    fn test_http_401_counts_as_auth_expired() {
        let err = ApiError::from_status(reqwest::StatusCode::UNAUTHORIZED, "");
        assert!(err.is_auth_expired());
        assert_eq!(err.to_string(), "HTTP error! status: 401");

        let err = ApiError::from_status(reqwest::StatusCode::BAD_GATEWAY, "upstream");
        assert!(!err.is_auth_expired());
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }
}
