//! Error types for the blog MCP server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! Errors that reach the HTTP boundary implement axum's `IntoResponse`.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// Errors from the backing stores.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Password hashing or verification failed.
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// A blocking task was cancelled or panicked.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Create a backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// OAuth 2.1 token-endpoint errors (RFC 6749 §5.2 vocabulary).
#[derive(thiserror::Error, Debug)]
pub enum OAuthError {
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),

    #[error("server_error: {0}")]
    Server(#[from] StoreError),

    #[error("server_error: token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

impl OAuthError {
    #[must_use]
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::InvalidRequest(description.into())
    }

    #[must_use]
    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::InvalidGrant(description.into())
    }

    /// The standard OAuth error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::Server(_) | Self::Signing(_) => "server_error",
        }
    }

    /// Human-readable description for the `error_description` field.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::InvalidRequest(d) | Self::InvalidGrant(d) | Self::UnsupportedGrantType(d) => {
                d.clone()
            }
            Self::Server(_) | Self::Signing(_) => {
                "The authorization server encountered an error".to_string()
            }
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Server(_) | Self::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "Token endpoint failed");
        }

        let mut response = (
            self.status(),
            Json(serde_json::json!({
                "error": self.error_code(),
                "error_description": self.description()
            })),
        )
            .into_response();

        let headers = response.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        response
    }
}

/// Bearer authentication failures.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    /// No usable `Authorization: Bearer` header.
    #[error("Missing bearer token")]
    MissingToken,

    /// The token's expiry is in the past.
    #[error("Access token expired")]
    Expired,

    /// Bad signature, malformed token, wrong issuer or missing claims.
    #[error("Invalid access token: {0}")]
    Invalid(String),

    /// The token subject no longer exists.
    #[error("Unknown token subject")]
    UnknownSubject,

    /// The credential store could not be consulted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// `WWW-Authenticate` challenge value (RFC 6750 §3, RFC 9728 §5.1).
    #[must_use]
    pub fn challenge(&self, resource_metadata: &str) -> String {
        match self {
            Self::MissingToken => {
                format!(r#"Bearer realm="mcp", resource_metadata="{resource_metadata}""#)
            }
            _ => format!(
                r#"Bearer realm="mcp", error="invalid_token", error_description="{}", resource_metadata="{resource_metadata}""#,
                self.public_description()
            ),
        }
    }

    fn public_description(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing bearer token",
            Self::Expired => "the access token expired",
            Self::Invalid(_) | Self::UnknownSubject => "could not validate credentials",
            Self::Store(_) => "credential store unavailable",
        }
    }
}

/// An [`AuthError`] bound to the discovery URL advertised in the challenge.
#[derive(Debug)]
pub struct AuthRejection {
    pub error: AuthError,
    pub resource_metadata: String,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        // An unreachable store says nothing about the token itself
        if let AuthError::Store(e) = &self.error {
            tracing::error!(error = %e, "Credential store unavailable during bearer resolution");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "detail": self.error.public_description() })),
            )
                .into_response();
        }

        tracing::debug!(error = %self.error, "Rejected bearer credentials");

        let challenge = self.error.challenge(&self.resource_metadata);
        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "detail": self.error.public_description()
            })),
        )
            .into_response();

        if let Ok(value) = HeaderValue::from_str(&challenge) {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

/// Protocol endpoint failures detected before any dispatch.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("Missing Origin header")]
    MissingOrigin,

    #[error("Unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(String),

    #[error("Missing MCP-Protocol-Version header")]
    MissingProtocolVersion,

    #[error("Server-initiated message streams are not supported")]
    StreamNotSupported,
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::StreamNotSupported => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::BAD_REQUEST,
        };

        tracing::debug!(status = %status, error = %self, "Rejected protocol request");

        let mut response = (status, Json(serde_json::json!({ "detail": self.to_string() })))
            .into_response();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}

/// Errors from MCP tool execution.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// Input validation failed
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// Arguments did not match the tool's input schema
    #[error("Invalid arguments: {0}")]
    Arguments(#[from] serde_json::Error),

    /// The requested item does not exist for this caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Error from the content store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ToolError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Convert to a user-friendly error message for MCP response.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::Validation { field, message } => {
                format!("Invalid input for '{field}': {message}")
            }
            Self::NotFound(resource) => {
                format!("Not found: {resource}. Please check the ID is correct.")
            }
            Self::Store(_) => "The content store is unavailable, please retry later.".to_string(),
            Self::Arguments(_) => self.to_string(),
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_error_codes() {
        assert_eq!(OAuthError::invalid_request("x").error_code(), "invalid_request");
        assert_eq!(OAuthError::invalid_grant("x").error_code(), "invalid_grant");
        assert_eq!(
            OAuthError::UnsupportedGrantType("password".into()).error_code(),
            "unsupported_grant_type"
        );
        assert_eq!(OAuthError::invalid_grant("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            OAuthError::from(StoreError::backend("down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_error_hides_backend_detail() {
        let err = OAuthError::from(StoreError::backend("connection refused to db-1"));
        assert!(!err.description().contains("db-1"));
    }

    #[test]
    fn test_challenge_for_missing_token_has_no_error_code() {
        let challenge = AuthError::MissingToken.challenge("https://x/.well-known/oauth-protected-resource");
        assert!(challenge.starts_with("Bearer "));
        assert!(!challenge.contains("invalid_token"));
        assert!(challenge.contains("resource_metadata"));
    }

    #[test]
    fn test_challenge_for_expired_token() {
        let challenge = AuthError::Expired.challenge("https://x/meta");
        assert!(challenge.contains(r#"error="invalid_token""#));
        assert!(challenge.contains("expired"));
    }

    #[test]
    fn test_rejection_is_unauthorized_with_challenge() {
        let response = AuthRejection {
            error: AuthError::Expired,
            resource_metadata: "https://x/meta".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn test_store_outage_is_server_error_without_challenge() {
        let response = AuthRejection {
            error: AuthError::from(StoreError::backend("connection refused")),
            resource_metadata: "https://x/meta".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn test_tool_error_user_message() {
        let err = ToolError::validation("content", "cannot be empty");
        assert!(err.to_user_message().contains("content"));
        assert!(err.to_user_message().contains("cannot be empty"));

        let err = ToolError::not_found("blog post 7");
        assert!(err.to_user_message().contains("blog post 7"));
    }
}
