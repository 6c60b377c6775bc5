//! In-memory store implementations.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use super::{CredentialStore, PostStore, password};
use crate::error::StoreResult;
use crate::models::{BlogPost, PostId, User, UserId};

/// Users held in process memory.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
    next_id: AtomicU64,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user, hashing the password on the blocking pool.
    ///
    /// Re-adding an existing username replaces that user's record but keeps
    /// its id.
    pub async fn add_user(
        &self,
        username: &str,
        plaintext: &str,
        email: Option<&str>,
        full_name: Option<&str>,
    ) -> StoreResult<UserId> {
        let secret = plaintext.to_owned();
        let password_hash =
            tokio::task::spawn_blocking(move || password::hash_password(&secret)).await??;

        let mut users = self.users.write().await;
        let id = users
            .values()
            .find(|u| u.username == username)
            .map(|u| u.id)
            .unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::Relaxed) + 1);

        users.insert(
            id,
            User {
                id,
                username: username.to_owned(),
                email: email.map(str::to_owned),
                full_name: full_name.map(str::to_owned),
                password_hash,
            },
        );

        tracing::debug!(user_id = id, username = %username, "Registered user");
        Ok(id)
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

impl std::fmt::Debug for MemoryUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryUserStore").finish()
    }
}

type Shelf = Arc<Mutex<Vec<BlogPost>>>;

/// Posts held in process memory, one shelf per owner.
///
/// Writes for an owner are serialized by that owner's mutex; different owners
/// never contend beyond the brief map lookup.
#[derive(Default)]
pub struct MemoryPostStore {
    shelves: RwLock<HashMap<UserId, Shelf>>,
    next_id: AtomicU64,
}

impl MemoryPostStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn shelf(&self, owner: UserId) -> Option<Shelf> {
        self.shelves.read().await.get(&owner).cloned()
    }

    async fn shelf_or_create(&self, owner: UserId) -> Shelf {
        if let Some(shelf) = self.shelf(owner).await {
            return shelf;
        }
        Arc::clone(self.shelves.write().await.entry(owner).or_default())
    }
}

#[async_trait::async_trait]
impl PostStore for MemoryPostStore {
    async fn list(&self, owner: UserId) -> StoreResult<Vec<BlogPost>> {
        let Some(shelf) = self.shelf(owner).await else {
            return Ok(Vec::new());
        };
        let mut posts = shelf.lock().await.clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    async fn get(&self, owner: UserId, id: PostId) -> StoreResult<Option<BlogPost>> {
        let Some(shelf) = self.shelf(owner).await else {
            return Ok(None);
        };
        let posts = shelf.lock().await;
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, owner: UserId, content: String) -> StoreResult<BlogPost> {
        let shelf = self.shelf_or_create(owner).await;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let post = BlogPost::new(id, owner, content);
        shelf.lock().await.push(post.clone());
        Ok(post)
    }

    async fn update(
        &self,
        owner: UserId,
        id: PostId,
        content: String,
    ) -> StoreResult<Option<BlogPost>> {
        let Some(shelf) = self.shelf(owner).await else {
            return Ok(None);
        };
        let mut posts = shelf.lock().await;
        let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        post.content = content;
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }
}

impl std::fmt::Debug for MemoryPostStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPostStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_find_user() {
        let store = MemoryUserStore::new();
        let id = store.add_user("alice", "pw", Some("a@example.com"), None).await.unwrap();

        let user = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email.as_deref(), Some("a@example.com"));
        assert!(password::verify_password("pw", &user.password_hash).unwrap());

        assert_eq!(store.find_by_id(id).await.unwrap().unwrap().username, "alice");
        assert!(store.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_re_adding_user_keeps_id() {
        let store = MemoryUserStore::new();
        let first = store.add_user("alice", "one", None, None).await.unwrap();
        let second = store.add_user("alice", "two", None, None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_posts_are_owner_scoped() {
        let store = MemoryPostStore::new();
        let post = store.create(1, "hello".into()).await.unwrap();

        assert!(store.get(1, post.id).await.unwrap().is_some());
        assert!(store.get(2, post.id).await.unwrap().is_none());
        assert!(store.update(2, post.id, "hijack".into()).await.unwrap().is_none());
        assert!(store.list(2).await.unwrap().is_empty());

        let unchanged = store.get(1, post.id).await.unwrap().unwrap();
        assert_eq!(unchanged.content, "hello");
    }

    #[tokio::test]
    async fn test_update_replaces_content() {
        let store = MemoryPostStore::new();
        let post = store.create(1, "draft".into()).await.unwrap();
        let updated = store.update(1, post.id, "final".into()).await.unwrap().unwrap();
        assert_eq!(updated.content, "final");
        assert_eq!(updated.created_at, post.created_at);
        assert!(updated.updated_at >= post.updated_at);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = MemoryPostStore::new();
        let a = store.create(1, "a".into()).await.unwrap();
        let b = store.create(1, "b".into()).await.unwrap();
        let ids: Vec<_> = store.list(1).await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_ids_unique_across_owners() {
        let store = MemoryPostStore::new();
        let a = store.create(1, "a".into()).await.unwrap();
        let b = store.create(2, "b".into()).await.unwrap();
        assert_ne!(a.id, b.id);
    }
}
