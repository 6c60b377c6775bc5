//! Access token signing and validation, plus opaque secret generation.
//!
//! Access tokens are stateless HS256 JWTs. Codes and refresh tokens are random
//! URL-safe strings whose meaning lives in the ledgers.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::types::lifetime;
use crate::config::oauth::ACCESS_TOKEN_TTL;
use crate::error::AuthError;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Username of the resource owner.
    pub sub: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub jti: String,
}

/// Signs and verifies access tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    issuer: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Self {
            issuer,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Mint a token valid for the standard access-token lifetime.
    pub fn mint(&self, subject: &str, scopes: &[String]) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        self.mint_expiring_at(subject, scopes, now, now + lifetime(ACCESS_TOKEN_TTL))
    }

    /// Mint a token with explicit timestamps.
    pub fn mint_expiring_at(
        &self,
        subject: &str,
        scopes: &[String],
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = AccessClaims {
            sub: subject.to_owned(),
            scopes: scopes.to_vec(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            iss: self.issuer.clone(),
            jti: uuid::Uuid::new_v4().simple().to_string(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Verify signature, issuer and expiry.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e.to_string()),
            })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").field("issuer", &self.issuer).finish()
    }
}

/// Generate a random URL-safe secret from `bytes` bytes of entropy.
#[must_use]
pub fn generate_secret_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"unit-test-secret", "https://mcp.example.com")
    }

    #[test]
    fn test_mint_and_verify() {
        let issuer = issuer();
        let token = issuer.mint("alice", &["read".to_string()]).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.scopes, vec!["read"]);
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer();
        let now = Utc::now();
        let token = issuer
            .mint_expiring_at("alice", &[], now - Duration::hours(1), now - Duration::seconds(5))
            .unwrap();
        assert!(matches!(issuer.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issuer().mint("alice", &[]).unwrap();
        let other = TokenIssuer::new(b"another-secret", "https://mcp.example.com");
        assert!(matches!(other.verify(&token), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let token = issuer().mint("alice", &[]).unwrap();
        let other = TokenIssuer::new(b"unit-test-secret", "https://elsewhere.example.com");
        assert!(matches!(other.verify(&token), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(issuer().verify("not.a.jwt"), Err(AuthError::Invalid(_))));
        assert!(matches!(issuer().verify(""), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn test_token_ids_are_unique() {
        let issuer = issuer();
        let a = issuer.verify(&issuer.mint("alice", &[]).unwrap()).unwrap();
        let b = issuer.verify(&issuer.mint("alice", &[]).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_secret_token_entropy() {
        // 32 bytes -> 43 base64url characters, 48 bytes -> 64.
        assert_eq!(generate_secret_token(32).len(), 43);
        assert_eq!(generate_secret_token(48).len(), 64);
        assert_ne!(generate_secret_token(32), generate_secret_token(32));
        assert!(
            generate_secret_token(48)
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
