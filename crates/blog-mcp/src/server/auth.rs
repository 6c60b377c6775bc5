//! Request extractors guarding the protocol endpoint.
//!
//! [`McpPreconditions`] checks transport headers, [`Authenticated`] resolves the
//! bearer token into an [`Identity`]. Handlers list them in that order, so
//! transport errors are reported before authentication errors.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};

use super::AppState;
use crate::config::protocol::{PROTOCOL_VERSION, PROTOCOL_VERSION_HEADER};
use crate::error::{AuthError, AuthRejection, TransportError};
use crate::models::Identity;

/// Transport preconditions: an `Origin` header and, when configured, an exact
/// `MCP-Protocol-Version` match.
#[derive(Debug, Clone, Copy)]
pub struct McpPreconditions;

impl FromRequestParts<Arc<AppState>> for McpPreconditions {
    type Rejection = TransportError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(header::ORIGIN) {
            return Err(TransportError::MissingOrigin);
        }

        if state.config.require_protocol_version {
            match parts.headers.get(PROTOCOL_VERSION_HEADER) {
                None => return Err(TransportError::MissingProtocolVersion),
                Some(value) if value.as_bytes() == PROTOCOL_VERSION.as_bytes() => {}
                Some(value) => {
                    return Err(TransportError::UnsupportedProtocolVersion(
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    ));
                }
            }
        }

        Ok(Self)
    }
}

/// The caller behind a valid bearer token.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let reject = |error: AuthError| AuthRejection {
            error,
            resource_metadata: state.config.resource_metadata_url(),
        };

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| reject(AuthError::MissingToken))?;

        let identity = resolve(state, bearer.token()).await.map_err(reject)?;
        Ok(Self(identity))
    }
}

/// Validate a token and look up its subject.
pub async fn resolve(state: &AppState, token: &str) -> Result<Identity, AuthError> {
    let claims = state.auth.token_issuer().verify(token)?;

    let user = state
        .users
        .find_by_username(&claims.sub)
        .await?
        .ok_or(AuthError::UnknownSubject)?;

    Ok(Identity { user_id: user.id, username: user.username, scopes: claims.scopes })
}
