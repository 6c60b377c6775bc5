//! HTTP server: OAuth 2.1 authorization endpoints plus the protected MCP endpoint.
//!
//! ## Request path
//!
//! 1. Transport preconditions (`Origin`, optional protocol version header)
//! 2. Bearer token validation into an [`Identity`](crate::models::Identity)
//! 3. JSON-RPC classification and dispatch through [`McpProcessor`]
//! 4. Framing: one JSON reply, an SSE stream for several, or `202 Accepted`

pub mod auth;
pub mod jsonrpc;
pub mod oauth;
pub mod processor;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;

use crate::config::Config;
use crate::store::{CredentialStore, PostStore};
use crate::tools::{self, ToolContext};
use oauth::AuthorizationServer;
use processor::McpProcessor;

/// State shared by every HTTP handler.
pub struct AppState {
    pub config: Config,
    pub auth: Arc<AuthorizationServer>,
    pub users: Arc<dyn CredentialStore>,
    pub processor: McpProcessor,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("base_url", &self.config.base_url)
            .field("auth", &self.auth)
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}

/// MCP server for per-user blog posts.
pub struct McpServer {
    state: Arc<AppState>,
}

impl McpServer {
    /// Create a new MCP server over the given stores.
    #[must_use]
    pub fn new(
        config: Config,
        users: Arc<dyn CredentialStore>,
        posts: Arc<dyn PostStore>,
    ) -> Self {
        let auth = Arc::new(AuthorizationServer::new(&config, Arc::clone(&users)));
        let processor = McpProcessor::new(tools::register_all_tools(), ToolContext::new(posts));

        Self { state: Arc::new(AppState { config, auth, users, processor }) }
    }

    /// Shared handler state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// The HTTP router, without binding a socket.
    #[must_use]
    pub fn router(&self) -> Router {
        transport::create_router(self.state())
    }

    /// Run the server in HTTP mode.
    ///
    /// # Errors
    ///
    /// Returns error on server failure.
    pub async fn run_http(self, port: u16) -> anyhow::Result<()> {
        tracing::info!(
            base_url = %self.state.config.base_url,
            tools = self.state.processor.tool_catalog().len(),
            "Starting blog MCP server on port {}",
            port
        );

        let cleanup = Arc::clone(&self.state.auth).start_cleanup_task();

        let router = self.router();
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!("HTTP server listening on http://{}", addr);

        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        cleanup.abort();
        tracing::info!("HTTP server shut down");
        Ok(())
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer").field("state", &self.state).finish()
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received shutdown signal"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    }
}
