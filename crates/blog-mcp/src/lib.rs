//! Blog MCP Server
//!
//! A Model Context Protocol (MCP) server that lets LLM agents read and write a
//! user's blog posts, guarded by an embedded OAuth 2.1 authorization server.
//!
//! # Features
//!
//! - **OAuth 2.1**: authorization code grant with PKCE, rotating refresh tokens,
//!   RFC 8414 / RFC 9728 discovery documents
//! - **Stateless access tokens**: HS256 JWTs validated on every protocol request
//! - **Streamable HTTP**: JSON-RPC batches answered as JSON, SSE or `202 Accepted`
//! - **Owner-scoped tools**: every tool call runs as the authenticated user
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use blog_mcp::{Config, McpServer, MemoryPostStore, MemoryUserStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let users = Arc::new(MemoryUserStore::new());
//!     users.add_user("alice", "correct horse", None, None).await?;
//!
//!     let server = McpServer::new(Config::from_env()?, users, Arc::new(MemoryPostStore::new()));
//!     server.run_http(8000).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod store;
pub mod tools;

pub use config::Config;
pub use error::{AuthError, OAuthError, StoreError, ToolError, TransportError};
pub use server::McpServer;
pub use store::{MemoryPostStore, MemoryUserStore};
