//! OAuth 2.1 endpoint handlers.
//!
//! Implements:
//! - RFC 9728: OAuth Protected Resource Metadata
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 7636: PKCE (S256, plain)
//! - RFC 6749: Authorization Code and Refresh Token grants

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, State, rejection::FormRejection},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use super::authority::{
    AuthorizeDecision, AuthorizeParams, LoginParams, TOO_MANY_ATTEMPTS, TokenRequest, TokenSet,
};
use super::login::render_login_page;
use crate::error::OAuthError;
use crate::server::AppState;

// ─── RFC 9728: Protected Resource Metadata ───────────────────────────────────

/// `GET /.well-known/oauth-protected-resource`
///
/// Tells clients where to find the authorization server for this resource.
pub async fn handle_protected_resource(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let base_url = &state.config.base_url;
    Json(serde_json::json!({
        "resource": format!("{base_url}/mcp"),
        "authorization_servers": [base_url],
        "bearer_methods_supported": ["header"],
        "scopes_supported": state.auth.clients().scopes_supported()
    }))
}

// ─── RFC 8414: Authorization Server Metadata ─────────────────────────────────

/// `GET /.well-known/oauth-authorization-server`
///
/// Describes the OAuth endpoints and capabilities.
pub async fn handle_auth_server_metadata(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let base_url = &state.config.base_url;
    Json(serde_json::json!({
        "issuer": base_url,
        "authorization_endpoint": format!("{base_url}/oauth/authorize"),
        "token_endpoint": format!("{base_url}/oauth/token"),
        "scopes_supported": state.auth.clients().scopes_supported(),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "token_endpoint_auth_methods_supported": ["none"],
        "code_challenge_methods_supported": ["S256", "plain"]
    }))
}

// ─── Authorization Endpoint ──────────────────────────────────────────────────

/// `GET /oauth/authorize`
///
/// Validates the request and renders the login form.
pub async fn handle_authorize(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    state.auth.authorize(&params).into_response()
}

/// `POST /oauth/login`
///
/// Authenticates the resource owner and redirects back with a code.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    Form(params): Form<LoginParams>,
) -> Response {
    match state.auth.login(&params).await {
        Ok(decision) => decision.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Login failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Login is temporarily unavailable").into_response()
        }
    }
}

impl IntoResponse for AuthorizeDecision {
    fn into_response(self) -> Response {
        match self {
            Self::ShowLogin { request, error } => {
                Html(render_login_page(&request, error)).into_response()
            }
            Self::Throttled(request) => (
                StatusCode::TOO_MANY_REQUESTS,
                Html(render_login_page(&request, Some(TOO_MANY_ATTEMPTS))),
            )
                .into_response(),
            Self::Redirect(location) => {
                (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
            }
            Self::Reject(message) => (StatusCode::BAD_REQUEST, message).into_response(),
        }
    }
}

// ─── Token Endpoint ──────────────────────────────────────────────────────────

/// `POST /oauth/token`
///
/// Exchange an authorization code for tokens, or rotate a refresh token.
/// A body that does not decode as a token form is an `invalid_request`.
pub async fn handle_token(
    State(state): State<Arc<AppState>>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let req = match form {
        Ok(Form(req)) => req,
        Err(rejection) => {
            tracing::debug!(status = %rejection.status(), "Malformed token request");
            return OAuthError::invalid_request(rejection.body_text()).into_response();
        }
    };

    match state.auth.token(&req).await {
        Ok(tokens) => token_success(&tokens),
        Err(e) => {
            tracing::debug!(grant_type = ?req.grant_type, error = %e, "Token request rejected");
            e.into_response()
        }
    }
}

/// Build a token response with required OAuth 2.0 cache headers (RFC 6749 §5.1).
fn token_success(tokens: &TokenSet) -> Response {
    let mut response = Json(tokens).into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}
