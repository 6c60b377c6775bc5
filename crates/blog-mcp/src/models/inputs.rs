//! Input models for MCP tool parameters.

use serde::{Deserialize, Deserializer, Serialize};

use super::PostId;

/// Input for reading a single post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadPostInput {
    /// Post to read.
    #[serde(deserialize_with = "post_id")]
    pub blog_post_id: PostId,
}

/// Input for creating a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    /// Content of the blog post.
    pub content: String,
}

/// Input for replacing the content of a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePostInput {
    /// Post to update.
    #[serde(deserialize_with = "post_id")]
    pub blog_post_id: PostId,

    /// New content of the blog post.
    pub new_content: String,
}

/// Input for listing the caller's posts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPostsInput {
    /// Maximum posts to return (newest first).
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Accept `7` as well as `"7"`; agents often quote ids.
fn post_id<'de, D>(deserializer: D) -> Result<PostId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(PostId),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid blog_post_id: {text:?}"))),
    }
}
