//! Store abstractions for users and content.
//!
//! The protocol engines only see these traits; the in-memory implementations
//! in [`memory`] can be replaced by a real datastore without touching them.

pub mod memory;
pub mod password;

use crate::error::StoreResult;
use crate::models::{BlogPost, PostId, User, UserId};

pub use memory::{MemoryPostStore, MemoryUserStore};

/// Read access to user records and password hashes.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>>;
}

/// Owner-scoped blog post storage.
///
/// Every operation takes the owner explicitly; a post belonging to someone
/// else behaves exactly like a post that does not exist.
#[async_trait::async_trait]
pub trait PostStore: Send + Sync {
    /// All posts of `owner`, newest first.
    async fn list(&self, owner: UserId) -> StoreResult<Vec<BlogPost>>;

    async fn get(&self, owner: UserId, id: PostId) -> StoreResult<Option<BlogPost>>;

    async fn create(&self, owner: UserId, content: String) -> StoreResult<BlogPost>;

    /// Replace the content of a post. Returns `None` if `owner` has no such post.
    async fn update(
        &self,
        owner: UserId,
        id: PostId,
        content: String,
    ) -> StoreResult<Option<BlogPost>>;
}
