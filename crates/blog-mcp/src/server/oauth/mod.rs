//! OAuth 2.1 authorization server for MCP authentication.
//!
//! A self-contained authorization server embedded in the binary. Clients are
//! statically configured; users log in through an HTML form; access tokens are
//! stateless JWTs while codes and refresh tokens live in ledgers.
//!
//! ## Supported Standards
//! - RFC 9728: OAuth Protected Resource Metadata
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 7636: PKCE (S256, plain)
//! - RFC 6749: Authorization Code Grant, Refresh Token Grant

pub mod authority;
pub mod clients;
pub mod handlers;
pub mod ledger;
pub mod login;
pub mod pkce;
pub mod tokens;
pub mod types;

pub use authority::{
    AuthorizationRequest, AuthorizationServer, AuthorizeDecision, AuthorizeParams, LoginParams,
    TokenRequest, TokenSet,
};
pub use clients::ClientRegistry;
pub use ledger::{AuthCodeLedger, MemoryLedger, Redemption, RefreshLedger};
pub use tokens::{AccessClaims, TokenIssuer};
pub use types::{AuthorizationGrant, CodeChallengeMethod, RefreshGrant};
