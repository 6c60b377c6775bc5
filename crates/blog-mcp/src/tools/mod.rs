//! MCP tool implementations.
//!
//! Each tool:
//! 1. Parses and validates its input parameters
//! 2. Calls the content store, scoped to the calling user
//! 3. Formats the result as JSON text

mod posts;

pub use posts::*;

use std::sync::Arc;

use crate::error::ToolResult;
use crate::models::Identity;
use crate::store::PostStore;

/// Tool execution context.
pub struct ToolContext {
    /// Content store.
    pub posts: Arc<dyn PostStore>,
}

impl ToolContext {
    /// Create a new tool context.
    #[must_use]
    pub fn new(posts: Arc<dyn PostStore>) -> Self {
        Self { posts }
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext").finish()
    }
}

/// Trait for MCP tools.
#[async_trait::async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (e.g., "read_user_blog_post").
    fn name(&self) -> &'static str;

    /// Tool description for LLM.
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool on behalf of `caller`.
    async fn execute(
        &self,
        ctx: &ToolContext,
        caller: &Identity,
        input: serde_json::Value,
    ) -> ToolResult<String>;
}

/// Register all tools.
#[must_use]
pub fn register_all_tools() -> Vec<Box<dyn McpTool>> {
    vec![
        Box::new(posts::ReadPostTool),
        Box::new(posts::CreatePostTool),
        Box::new(posts::UpdatePostTool),
        Box::new(posts::ListPostsTool),
    ]
}
