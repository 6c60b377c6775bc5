//! Blog MCP Server - Entry Point
//!
//! Serves the OAuth 2.1 authorization endpoints and the protected MCP endpoint over HTTP.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use blog_mcp::{
    config::Config,
    server::McpServer,
    store::{MemoryPostStore, MemoryUserStore, PostStore},
};

#[derive(Parser, Debug)]
#[command(name = "blog-mcp")]
#[command(about = "OAuth-protected MCP server for per-user blog posts")]
#[command(version)]
struct Cli {
    /// HTTP server port
    #[arg(long, default_value = "8000", env = "PORT")]
    port: u16,

    /// Public base URL, used as token issuer and in discovery documents
    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// HMAC secret for access tokens (random per process if unset)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Require an exact MCP-Protocol-Version header on protocol requests
    #[arg(long, env = "MCP_STRICT_PROTOCOL_VERSION")]
    strict_protocol_version: bool,

    /// Seed the demo user `johndoe` with this password
    #[arg(long, env = "DEMO_USER_PASSWORD", hide_env_values = true)]
    demo_password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting blog MCP server");

    let mut config = match (cli.base_url, cli.jwt_secret) {
        (Some(base_url), Some(secret)) => Config::new(base_url, secret),
        (base_url, secret) => {
            let from_env = Config::from_env()?;
            Config::new(
                base_url.unwrap_or(from_env.base_url),
                secret.unwrap_or(from_env.jwt_secret),
            )
        }
    };
    config.require_protocol_version = cli.strict_protocol_version;

    let users = Arc::new(MemoryUserStore::new());
    let posts = Arc::new(MemoryPostStore::new());

    if let Some(password) = cli.demo_password {
        let id = users
            .add_user("johndoe", &password, Some("johndoe@example.com"), Some("John Doe"))
            .await?;
        posts.create(id, "Yesterday was a good day".to_string()).await?;
        tracing::info!(user_id = id, "Seeded demo user johndoe");
    } else {
        tracing::warn!("DEMO_USER_PASSWORD not set, no users can log in");
    }

    let server = McpServer::new(config, users, posts);
    server.run_http(cli.port).await
}
