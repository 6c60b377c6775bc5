//! OAuth 2.1 grant types.

use chrono::{DateTime, Utc};

use crate::models::UserId;

/// PKCE transformation bound to an authorization code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeChallengeMethod {
    #[default]
    S256,
    Plain,
    None,
}

impl CodeChallengeMethod {
    /// Parse the `code_challenge_method` request parameter.
    ///
    /// An absent or empty value means `S256`. Unknown methods return `None`.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value {
            None | Some("") | Some("S256") => Some(Self::S256),
            Some("plain") => Some(Self::Plain),
            Some("none") => Some(Self::None),
            Some(_) => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
            Self::None => "none",
        }
    }
}

/// Data bound to a one-time authorization code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGrant {
    pub client_id: String,
    pub user_id: UserId,
    pub redirect_uri: String,
    pub scope: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: CodeChallengeMethod,
    pub expires_at: DateTime<Utc>,
}

/// Data bound to a refresh token. Replaced, never mutated, on use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshGrant {
    pub client_id: String,
    pub user_id: UserId,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
}

/// Anything a ledger can expire.
pub trait Expiring {
    fn expires_at(&self) -> DateTime<Utc>;

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() <= now
    }
}

impl Expiring for AuthorizationGrant {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl Expiring for RefreshGrant {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Convert a fixed TTL into a timestamp offset.
#[must_use]
pub fn lifetime(ttl: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero())
}

/// Split a space-delimited scope string.
#[must_use]
pub fn parse_scopes(scope: &str) -> Vec<String> {
    scope.split_whitespace().map(str::to_owned).collect()
}
