//! Blog posts, the content the MCP tools act on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Post identifier, unique across owners.
pub type PostId = u64;

/// A blog post owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: PostId,
    pub owner: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    #[must_use]
    pub fn new(id: PostId, owner: UserId, content: String) -> Self {
        let now = Utc::now();
        Self { id, owner, content, created_at: now, updated_at: now }
    }
}
