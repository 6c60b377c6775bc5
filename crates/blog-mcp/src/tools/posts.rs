//! Blog post tools: read_user_blog_post, create_user_blog_post, update_user_blog_post, list_user_blog_posts.
//!
//! Every tool reads and writes only the caller's posts. Someone else's post is
//! reported exactly like a missing one.

use serde_json::json;

use super::{McpTool, ToolContext};
use crate::error::{ToolError, ToolResult};
use crate::models::{
    BlogPost, CreatePostInput, Identity, ListPostsInput, ReadPostInput, UpdatePostInput,
};

/// Upper bound on post content, in characters.
pub const MAX_CONTENT_CHARS: usize = 20_000;

fn blog_post_id_schema() -> serde_json::Value {
    json!({
        "type": ["integer", "string"],
        "description": "ID of the blog post (number or numeric string)"
    })
}

fn validate_content(field: &str, content: &str) -> ToolResult<()> {
    if content.trim().is_empty() {
        return Err(ToolError::validation(field, "cannot be empty"));
    }
    let chars = content.chars().count();
    if chars > MAX_CONTENT_CHARS {
        return Err(ToolError::validation(
            field,
            format!("is {chars} characters, the maximum is {MAX_CONTENT_CHARS}"),
        ));
    }
    Ok(())
}

fn render(post: &BlogPost) -> ToolResult<String> {
    Ok(serde_json::to_string_pretty(post)?)
}

/// Read one of the caller's posts.
pub struct ReadPostTool;

#[async_trait::async_trait]
impl McpTool for ReadPostTool {
    fn name(&self) -> &'static str {
        "read_user_blog_post"
    }

    fn description(&self) -> &'static str {
        "Read a blog post that the user wrote"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "blog_post_id": blog_post_id_schema()
            },
            "required": ["blog_post_id"]
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        caller: &Identity,
        input: serde_json::Value,
    ) -> ToolResult<String> {
        let params: ReadPostInput = serde_json::from_value(input)?;

        let post = ctx
            .posts
            .get(caller.user_id, params.blog_post_id)
            .await?
            .ok_or_else(|| ToolError::not_found(format!("blog post {}", params.blog_post_id)))?;

        render(&post)
    }
}

/// Create a post owned by the caller.
pub struct CreatePostTool;

#[async_trait::async_trait]
impl McpTool for CreatePostTool {
    fn name(&self) -> &'static str {
        "create_user_blog_post"
    }

    fn description(&self) -> &'static str {
        "Create a new blog post"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "Content of the blog post"
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        caller: &Identity,
        input: serde_json::Value,
    ) -> ToolResult<String> {
        let params: CreatePostInput = serde_json::from_value(input)?;
        validate_content("content", &params.content)?;

        let post = ctx.posts.create(caller.user_id, params.content).await?;
        tracing::info!(user_id = caller.user_id, post_id = post.id, "Created blog post");

        render(&post)
    }
}

/// Replace the content of one of the caller's posts.
pub struct UpdatePostTool;

#[async_trait::async_trait]
impl McpTool for UpdatePostTool {
    fn name(&self) -> &'static str {
        "update_user_blog_post"
    }

    fn description(&self) -> &'static str {
        "Update an existing blog post"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "blog_post_id": blog_post_id_schema(),
                "new_content": {
                    "type": "string",
                    "description": "New content of the blog post"
                }
            },
            "required": ["blog_post_id", "new_content"]
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        caller: &Identity,
        input: serde_json::Value,
    ) -> ToolResult<String> {
        let params: UpdatePostInput = serde_json::from_value(input)?;
        validate_content("new_content", &params.new_content)?;

        let post = ctx
            .posts
            .update(caller.user_id, params.blog_post_id, params.new_content)
            .await?
            .ok_or_else(|| ToolError::not_found(format!("blog post {}", params.blog_post_id)))?;
        tracing::info!(user_id = caller.user_id, post_id = post.id, "Updated blog post");

        render(&post)
    }
}

/// List the caller's posts, newest first.
pub struct ListPostsTool;

#[async_trait::async_trait]
impl McpTool for ListPostsTool {
    fn name(&self) -> &'static str {
        "list_user_blog_posts"
    }

    fn description(&self) -> &'static str {
        "List the blog posts the user wrote, newest first"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum posts to return"
                }
            }
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        caller: &Identity,
        input: serde_json::Value,
    ) -> ToolResult<String> {
        let params: ListPostsInput = if input.is_null() {
            ListPostsInput::default()
        } else {
            serde_json::from_value(input)?
        };

        if params.limit == Some(0) {
            return Err(ToolError::validation("limit", "must be at least 1"));
        }

        let mut posts = ctx.posts.list(caller.user_id).await?;
        if let Some(limit) = params.limit {
            posts.truncate(limit);
        }

        Ok(serde_json::to_string_pretty(&json!({
            "count": posts.len(),
            "posts": posts
        }))?)
    }
}
