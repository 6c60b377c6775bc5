//! The OAuth 2.1 authorization server.
//!
//! Orchestrates the three steps of the authorization-code flow:
//!
//! 1. `authorize` validates the client and PKCE parameters and renders a login form
//! 2. `login` authenticates the resource owner and mints a one-time code
//! 3. `token` exchanges a code (or a refresh token) for an access token
//!
//! HTTP concerns live in [`super::handlers`]; this module only decides.

use std::sync::Arc;

use chrono::Utc;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use url::Url;

use super::clients::ClientRegistry;
use super::ledger::{AuthCodeLedger, MemoryLedger, Redemption, RefreshLedger};
use super::pkce;
use super::tokens::{TokenIssuer, generate_secret_token};
use super::types::{AuthorizationGrant, CodeChallengeMethod, RefreshGrant, lifetime, parse_scopes};
use crate::config::Config;
use crate::config::oauth::{
    ACCESS_TOKEN_TTL, AUTH_CODE_BYTES, AUTH_CODE_TTL, CLEANUP_INTERVAL, DEFAULT_SCOPE,
    REFRESH_TOKEN_BYTES, REFRESH_TOKEN_TTL,
};
use crate::error::{OAuthError, StoreResult};
use crate::store::CredentialStore;
use crate::store::password;

/// Shown for every failed login, whichever field was wrong.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Shown when a username exceeds its login quota.
pub const TOO_MANY_ATTEMPTS: &str = "Too many login attempts. Please wait a minute and try again.";

const INVALID_CLIENT: &str = "Invalid client ID or redirect URI";

/// Raw authorization request parameters, as received on the query string or
/// round-tripped through the login form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizeParams {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub state: Option<String>,
    pub scope: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

/// Login form submission: the authorization parameters plus credentials.
#[derive(Clone, Default, Deserialize)]
pub struct LoginParams {
    #[serde(flatten)]
    pub request: AuthorizeParams,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for LoginParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginParams")
            .field("request", &self.request)
            .field("username", &self.username)
            .finish()
    }
}

/// An authorization request that passed client and PKCE validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub client_name: String,
    pub redirect_uri: String,
    pub state: Option<String>,
    pub scope: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: CodeChallengeMethod,
}

/// What the authorization and login endpoints should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeDecision {
    /// Render the login form, optionally with an error message.
    ShowLogin { request: AuthorizationRequest, error: Option<&'static str> },
    /// Re-render the login form with `429 Too Many Requests`.
    Throttled(AuthorizationRequest),
    /// Send the user agent back to the client.
    Redirect(String),
    /// Refuse without redirecting: the client or redirect URI is not trusted.
    Reject(&'static str),
}

/// Token endpoint form body.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub client_id: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Successful token endpoint response (RFC 6749 §5.1).
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: String,
    pub scope: String,
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// The authorization server.
pub struct AuthorizationServer {
    clients: ClientRegistry,
    users: Arc<dyn CredentialStore>,
    codes: Arc<dyn AuthCodeLedger>,
    refresh_tokens: Arc<dyn RefreshLedger>,
    tokens: TokenIssuer,
    login_limiter: DefaultKeyedRateLimiter<String>,
}

impl AuthorizationServer {
    /// Create a server with in-memory ledgers.
    #[must_use]
    pub fn new(config: &Config, users: Arc<dyn CredentialStore>) -> Self {
        Self::with_ledgers(
            config,
            users,
            Arc::new(MemoryLedger::<AuthorizationGrant>::new()),
            Arc::new(MemoryLedger::<RefreshGrant>::new()),
        )
    }

    /// Create a server over caller-supplied ledgers.
    #[must_use]
    pub fn with_ledgers(
        config: &Config,
        users: Arc<dyn CredentialStore>,
        codes: Arc<dyn AuthCodeLedger>,
        refresh_tokens: Arc<dyn RefreshLedger>,
    ) -> Self {
        Self {
            clients: ClientRegistry::new(config.clients.iter().cloned()),
            users,
            codes,
            refresh_tokens,
            tokens: TokenIssuer::new(config.jwt_secret.as_bytes(), config.base_url.clone()),
            login_limiter: RateLimiter::keyed(Quota::per_minute(config.login_attempts_per_minute)),
        }
    }

    #[must_use]
    pub const fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    #[must_use]
    pub const fn token_issuer(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// `GET /oauth/authorize`.
    #[must_use]
    pub fn authorize(&self, params: &AuthorizeParams) -> AuthorizeDecision {
        match self.validate(params) {
            Ok(request) => {
                tracing::debug!(client_id = %request.client_id, "Rendering login form");
                AuthorizeDecision::ShowLogin { request, error: None }
            }
            Err(decision) => decision,
        }
    }

    /// `POST /oauth/login`.
    ///
    /// The hidden form fields are client-controlled, so the request is
    /// validated again before anything else.
    pub async fn login(&self, params: &LoginParams) -> StoreResult<AuthorizeDecision> {
        let request = match self.validate(&params.request) {
            Ok(request) => request,
            Err(decision) => return Ok(decision),
        };

        let username = params.username.clone().unwrap_or_default();
        let secret = params.password.clone().unwrap_or_default();

        if self.login_limiter.check_key(&username).is_err() {
            tracing::warn!(client_id = %request.client_id, username = %username, "Login throttled");
            return Ok(AuthorizeDecision::Throttled(request));
        }

        let user = if username.is_empty() {
            None
        } else {
            self.users.find_by_username(&username).await?
        };
        let verified =
            password::verify_blocking(secret, user.as_ref().map(|u| u.password_hash.clone()))
                .await?;

        let Some(user) = user.filter(|_| verified) else {
            tracing::info!(client_id = %request.client_id, "Login failed");
            return Ok(AuthorizeDecision::ShowLogin { request, error: Some(INVALID_CREDENTIALS) });
        };

        let code = generate_secret_token(AUTH_CODE_BYTES);
        let grant = AuthorizationGrant {
            client_id: request.client_id.clone(),
            user_id: user.id,
            redirect_uri: request.redirect_uri.clone(),
            scope: request.scope.clone(),
            code_challenge: request.code_challenge.clone(),
            code_challenge_method: request.code_challenge_method,
            expires_at: Utc::now() + lifetime(AUTH_CODE_TTL),
        };
        self.codes.insert(code.clone(), grant).await?;

        tracing::info!(
            client_id = %request.client_id,
            user_id = user.id,
            "Issued authorization code"
        );

        let mut pairs = vec![("code", code.as_str())];
        if let Some(state) = request.state.as_deref() {
            pairs.push(("state", state));
        }
        Ok(redirect_to(&request.redirect_uri, &pairs)
            .map_or(AuthorizeDecision::Reject(INVALID_CLIENT), AuthorizeDecision::Redirect))
    }

    /// `POST /oauth/token`.
    pub async fn token(&self, req: &TokenRequest) -> Result<TokenSet, OAuthError> {
        match non_empty(req.grant_type.as_ref()) {
            Some("authorization_code") => self.exchange_code(req).await,
            Some("refresh_token") => self.refresh(req).await,
            Some(other) => {
                Err(OAuthError::UnsupportedGrantType(format!("Unsupported grant type: {other}")))
            }
            None => Err(OAuthError::invalid_request("Missing grant_type parameter")),
        }
    }

    async fn exchange_code(&self, req: &TokenRequest) -> Result<TokenSet, OAuthError> {
        let (Some(code), Some(client_id), Some(redirect_uri), Some(verifier)) = (
            non_empty(req.code.as_ref()),
            non_empty(req.client_id.as_ref()),
            non_empty(req.redirect_uri.as_ref()),
            non_empty(req.code_verifier.as_ref()),
        ) else {
            return Err(OAuthError::invalid_request(
                "Missing required parameters for authorization_code grant",
            ));
        };

        let check = |grant: &AuthorizationGrant| -> Result<(), &'static str> {
            if grant.client_id != client_id || grant.redirect_uri != redirect_uri {
                return Err("client_id or redirect_uri does not match authorization request");
            }
            if let Some(challenge) = grant.code_challenge.as_deref() {
                if !pkce::verify(verifier, challenge, grant.code_challenge_method) {
                    return Err("Code verifier does not match code challenge");
                }
            }
            Ok(())
        };

        let grant = match self.codes.redeem(code, Utc::now(), &check).await? {
            Redemption::Redeemed(grant) => grant,
            Redemption::Unknown => {
                return Err(OAuthError::invalid_grant("Invalid authorization code"));
            }
            Redemption::Expired => {
                return Err(OAuthError::invalid_grant("Authorization code expired"));
            }
            Redemption::Rejected(reason) => {
                tracing::info!(client_id = %client_id, reason, "Rejected authorization code");
                return Err(OAuthError::invalid_grant(reason));
            }
        };

        let Some(user) = self.users.find_by_id(grant.user_id).await? else {
            return Err(OAuthError::invalid_grant("Resource owner no longer exists"));
        };

        let access_token = self.tokens.mint(&user.username, &parse_scopes(&grant.scope))?;
        let refresh_token = generate_secret_token(REFRESH_TOKEN_BYTES);
        self.refresh_tokens
            .insert(
                refresh_token.clone(),
                RefreshGrant {
                    client_id: grant.client_id.clone(),
                    user_id: user.id,
                    scope: grant.scope.clone(),
                    expires_at: Utc::now() + lifetime(REFRESH_TOKEN_TTL),
                },
            )
            .await?;

        tracing::info!(client_id = %grant.client_id, user_id = user.id, "Issued token pair");

        Ok(token_set(access_token, refresh_token, grant.scope))
    }

    async fn refresh(&self, req: &TokenRequest) -> Result<TokenSet, OAuthError> {
        let (Some(token), Some(client_id)) =
            (non_empty(req.refresh_token.as_ref()), non_empty(req.client_id.as_ref()))
        else {
            return Err(OAuthError::invalid_request(
                "Missing refresh_token or client_id parameter",
            ));
        };

        let check = |grant: &RefreshGrant| -> Result<(), &'static str> {
            if grant.client_id == client_id {
                Ok(())
            } else {
                Err("Refresh token was not issued to this client")
            }
        };

        let now = Utc::now();
        let replacement = generate_secret_token(REFRESH_TOKEN_BYTES);
        let rotated = self
            .refresh_tokens
            .rotate(token, now, &check, replacement.clone(), now + lifetime(REFRESH_TOKEN_TTL))
            .await?;

        let grant = match rotated {
            Redemption::Redeemed(grant) => grant,
            Redemption::Unknown => return Err(OAuthError::invalid_grant("Invalid refresh token")),
            Redemption::Expired => return Err(OAuthError::invalid_grant("Refresh token expired")),
            Redemption::Rejected(reason) => {
                tracing::info!(client_id = %client_id, reason, "Rejected refresh token");
                return Err(OAuthError::invalid_grant(reason));
            }
        };

        let user = match self.users.find_by_id(grant.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                self.refresh_tokens.revoke(&replacement).await?;
                return Err(OAuthError::invalid_grant("Resource owner no longer exists"));
            }
            Err(e) => {
                self.refresh_tokens.revoke(&replacement).await?;
                return Err(e.into());
            }
        };

        let access_token = match self.tokens.mint(&user.username, &parse_scopes(&grant.scope)) {
            Ok(token) => token,
            Err(e) => {
                self.refresh_tokens.revoke(&replacement).await?;
                return Err(e.into());
            }
        };

        tracing::info!(client_id = %grant.client_id, user_id = user.id, "Rotated refresh token");

        Ok(token_set(access_token, replacement, grant.scope))
    }

    /// Client and PKCE checks shared by `authorize` and `login`.
    ///
    /// The client check runs first: nothing is ever redirected to a URI that
    /// is not registered for the client.
    fn validate(&self, params: &AuthorizeParams) -> Result<AuthorizationRequest, AuthorizeDecision> {
        let client = non_empty(params.client_id.as_ref())
            .zip(non_empty(params.redirect_uri.as_ref()))
            .and_then(|(client_id, redirect_uri)| self.clients.verify(client_id, redirect_uri));
        let (Some(client), Some(redirect_uri)) = (client, non_empty(params.redirect_uri.as_ref()))
        else {
            tracing::warn!(client_id = ?params.client_id, "Unknown client or redirect URI");
            return Err(AuthorizeDecision::Reject(INVALID_CLIENT));
        };

        let state = non_empty(params.state.as_ref());
        let fail = |error: &str, description: Option<&str>| {
            let mut pairs = vec![("error", error)];
            if let Some(description) = description {
                pairs.push(("error_description", description));
            }
            if let Some(state) = state {
                pairs.push(("state", state));
            }
            redirect_to(redirect_uri, &pairs)
                .map_or(AuthorizeDecision::Reject(INVALID_CLIENT), AuthorizeDecision::Redirect)
        };

        if params.response_type.as_deref() != Some("code") {
            return Err(fail("unsupported_response_type", None));
        }

        let Some(method) = CodeChallengeMethod::parse(params.code_challenge_method.as_deref())
        else {
            return Err(fail("invalid_request", Some("unsupported_code_challenge_method")));
        };

        let code_challenge = non_empty(params.code_challenge.as_ref()).map(str::to_owned);
        if code_challenge.is_none() && method != CodeChallengeMethod::None {
            return Err(fail("invalid_request", Some("code_challenge_required")));
        }

        Ok(AuthorizationRequest {
            client_id: client.client_id.clone(),
            client_name: client.client_name.clone(),
            redirect_uri: redirect_uri.to_owned(),
            state: state.map(str::to_owned),
            scope: params.scope.clone().unwrap_or_else(|| DEFAULT_SCOPE.to_owned()),
            code_challenge,
            code_challenge_method: method,
        })
    }

    /// Purge expired codes and refresh tokens, and forget idle login quotas.
    pub async fn purge_expired(&self) -> StoreResult<(usize, usize)> {
        let now = Utc::now();
        let codes = self.codes.purge_expired(now).await?;
        let refresh_tokens = self.refresh_tokens.purge_expired(now).await?;
        self.login_limiter.retain_recent();
        Ok((codes, refresh_tokens))
    }

    /// Start the background sweep of expired grants.
    pub fn start_cleanup_task(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                match self.purge_expired().await {
                    Ok((0, 0)) => {}
                    Ok((codes, refresh_tokens)) => {
                        tracing::debug!(codes, refresh_tokens, "Cleaned up expired grants");
                    }
                    Err(e) => tracing::warn!(error = %e, "Grant cleanup failed"),
                }
            }
        })
    }
}

impl std::fmt::Debug for AuthorizationServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationServer")
            .field("clients", &self.clients)
            .field("tokens", &self.tokens)
            .finish()
    }
}

fn token_set(access_token: String, refresh_token: String, scope: String) -> TokenSet {
    TokenSet {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: ACCESS_TOKEN_TTL.as_secs(),
        refresh_token,
        scope,
    }
}

/// Treat empty form fields as absent.
fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Append query parameters to a registered redirect URI.
fn redirect_to(redirect_uri: &str, pairs: &[(&str, &str)]) -> Option<String> {
    let mut url = Url::parse(redirect_uri).ok()?;
    url.query_pairs_mut().extend_pairs(pairs);
    Some(url.into())
}
