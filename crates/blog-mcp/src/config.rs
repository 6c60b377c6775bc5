//! Configuration for the blog MCP server.

use std::num::NonZeroU32;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// OAuth protocol constants.
pub mod oauth {
    use std::num::NonZeroU32;
    use std::time::Duration;

    /// Authorization code lifetime (10 minutes).
    pub const AUTH_CODE_TTL: Duration = Duration::from_secs(10 * 60);

    /// Access token lifetime (30 minutes).
    pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

    /// Refresh token lifetime (30 days).
    pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

    /// Random bytes in an authorization code (256 bits).
    pub const AUTH_CODE_BYTES: usize = 32;

    /// Random bytes in a refresh token (384 bits).
    pub const REFRESH_TOKEN_BYTES: usize = 48;

    /// How often expired codes and refresh tokens are swept.
    pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

    /// Default login attempts allowed per username per minute.
    pub const LOGIN_ATTEMPTS_PER_MINUTE: NonZeroU32 = NonZeroU32::new(10).unwrap();

    /// Scope used when the authorization request names none.
    pub const DEFAULT_SCOPE: &str = "";
}

/// MCP protocol constants.
pub mod protocol {
    /// The protocol revision this server speaks.
    pub const PROTOCOL_VERSION: &str = "2025-06-18";

    /// Header carrying the negotiated protocol revision.
    pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

    /// Server name reported by `initialize`.
    pub const SERVER_NAME: &str = "blog-mcp";
}

/// A statically configured OAuth client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_name: String,
    pub redirect_uris: Vec<String>,
    pub allowed_scopes: Vec<String>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_name: impl Into<String>,
        redirect_uris: &[&str],
        allowed_scopes: &[&str],
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_name: client_name.into(),
            redirect_uris: redirect_uris.iter().map(|s| (*s).to_string()).collect(),
            allowed_scopes: allowed_scopes.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Server configuration.
#[derive(Clone)]
pub struct Config {
    /// Public base URL, used as token issuer and in discovery documents.
    pub base_url: String,

    /// HMAC secret for signing access tokens.
    pub jwt_secret: String,

    /// Require an exact `MCP-Protocol-Version` header on every protocol request.
    pub require_protocol_version: bool,

    /// Login attempts allowed per username per minute.
    pub login_attempts_per_minute: NonZeroU32,

    /// Registered OAuth clients.
    pub clients: Vec<ClientConfig>,
}

impl Config {
    /// Create a configuration with the default client registry.
    #[must_use]
    pub fn new(base_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            jwt_secret: jwt_secret.into(),
            require_protocol_version: false,
            login_attempts_per_minute: oauth::LOGIN_ATTEMPTS_PER_MINUTE,
            clients: default_clients(),
        }
    }

    /// Create a test configuration with a fixed secret and a single client.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            base_url: "https://mcp.example.com".to_string(),
            jwt_secret: "test-secret-not-for-production".to_string(),
            require_protocol_version: false,
            login_attempts_per_minute: oauth::LOGIN_ATTEMPTS_PER_MINUTE,
            clients: vec![ClientConfig::new(
                "c1",
                "Test Client",
                &["https://cb", "http://localhost:5173/callback"],
                &["read", "write"],
            )],
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `BASE_URL`, `JWT_SECRET` and `MCP_STRICT_PROTOCOL_VERSION`. A random
    /// signing secret is generated when `JWT_SECRET` is unset, which invalidates
    /// issued tokens on restart.
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET not set, using an ephemeral signing secret");
                generate_secret()
            }
        };
        let mut config = Self::new(base_url, jwt_secret);
        config.require_protocol_version = std::env::var("MCP_STRICT_PROTOCOL_VERSION")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Ok(config)
    }

    /// Enable or disable the strict protocol-version header check.
    #[must_use]
    pub fn with_strict_protocol_version(mut self, strict: bool) -> Self {
        self.require_protocol_version = strict;
        self
    }

    /// URL of the protected-resource metadata document.
    #[must_use]
    pub fn resource_metadata_url(&self) -> String {
        format!("{}/.well-known/oauth-protected-resource", self.base_url)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("require_protocol_version", &self.require_protocol_version)
            .field("login_attempts_per_minute", &self.login_attempts_per_minute)
            .field("clients", &self.clients.len())
            .finish()
    }
}

/// The client the companion editor extension and webview authenticate as.
#[must_use]
pub fn default_clients() -> Vec<ClientConfig> {
    vec![ClientConfig::new(
        "my-mcp-client",
        "My MCP Client",
        &["http://localhost:5173/callback", "http://127.0.0.1:41648/callback"],
        &["read", "write"],
    )]
}

/// Generate a random URL-safe signing secret.
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
