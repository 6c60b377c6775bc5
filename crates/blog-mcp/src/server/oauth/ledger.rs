//! Authorization code and refresh token ledgers.
//!
//! Both ledgers are keyed by the opaque secret handed to the client. Redemption
//! and rotation are single check-and-delete / check-and-replace operations, so
//! a secret validates at most once even under concurrent requests.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::types::{AuthorizationGrant, Expiring, RefreshGrant};
use crate::error::StoreResult;

/// Predicate run against a grant inside the ledger's critical section.
///
/// Returning `Err` leaves the grant in place; the message is for logs only.
pub type GrantCheck<'a, G> = &'a (dyn Fn(&G) -> Result<(), &'static str> + Send + Sync);

/// Outcome of redeeming or rotating a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption<G> {
    /// The grant was consumed and is returned to the caller.
    Redeemed(G),
    /// No such secret.
    Unknown,
    /// The secret had expired and has been purged.
    Expired,
    /// The check failed; the grant is untouched.
    Rejected(&'static str),
}

/// Store of one-time authorization codes.
#[async_trait::async_trait]
pub trait AuthCodeLedger: Send + Sync {
    async fn insert(&self, code: String, grant: AuthorizationGrant) -> StoreResult<()>;

    /// Atomically verify and consume a code.
    async fn redeem(
        &self,
        code: &str,
        now: DateTime<Utc>,
        check: GrantCheck<'_, AuthorizationGrant>,
    ) -> StoreResult<Redemption<AuthorizationGrant>>;

    /// Drop every expired code, returning how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize>;
}

/// Store of refresh tokens with rotation.
#[async_trait::async_trait]
pub trait RefreshLedger: Send + Sync {
    async fn insert(&self, token: String, grant: RefreshGrant) -> StoreResult<()>;

    /// Atomically verify `token`, invalidate it, and store `replacement` with
    /// the same binding and a new expiry. Returns the superseded grant.
    async fn rotate(
        &self,
        token: &str,
        now: DateTime<Utc>,
        check: GrantCheck<'_, RefreshGrant>,
        replacement: String,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Redemption<RefreshGrant>>;

    /// Remove a token. Returns whether it existed.
    async fn revoke(&self, token: &str) -> StoreResult<bool>;

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize>;
}

/// In-memory ledger over a single write-locked map.
pub struct MemoryLedger<G> {
    entries: RwLock<HashMap<String, G>>,
}

impl<G> MemoryLedger<G>
where
    G: Expiring + Clone + Send + Sync,
{
    #[must_use]
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn put(&self, key: String, grant: G) {
        self.entries.write().await.insert(key, grant);
    }

    /// Check-and-remove under the write lock, then hand the removed grant to
    /// `then` while the lock is still held.
    async fn take_with(
        &self,
        key: &str,
        now: DateTime<Utc>,
        check: GrantCheck<'_, G>,
        then: impl FnOnce(&mut HashMap<String, G>, &G) + Send,
    ) -> Redemption<G> {
        let mut entries = self.entries.write().await;

        let Some(grant) = entries.get(key) else {
            return Redemption::Unknown;
        };
        if grant.is_expired(now) {
            entries.remove(key);
            return Redemption::Expired;
        }
        if let Err(reason) = check(grant) {
            return Redemption::Rejected(reason);
        }

        match entries.remove(key) {
            Some(grant) => {
                then(&mut entries, &grant);
                Redemption::Redeemed(grant)
            }
            None => Redemption::Unknown,
        }
    }

    async fn purge(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, grant| !grant.is_expired(now));
        before - entries.len()
    }
}

impl<G> Default for MemoryLedger<G>
where
    G: Expiring + Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<G> std::fmt::Debug for MemoryLedger<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLedger").finish()
    }
}

#[async_trait::async_trait]
impl AuthCodeLedger for MemoryLedger<AuthorizationGrant> {
    async fn insert(&self, code: String, grant: AuthorizationGrant) -> StoreResult<()> {
        self.put(code, grant).await;
        Ok(())
    }

    async fn redeem(
        &self,
        code: &str,
        now: DateTime<Utc>,
        check: GrantCheck<'_, AuthorizationGrant>,
    ) -> StoreResult<Redemption<AuthorizationGrant>> {
        Ok(self.take_with(code, now, check, |_, _| {}).await)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        Ok(self.purge(now).await)
    }
}

#[async_trait::async_trait]
impl RefreshLedger for MemoryLedger<RefreshGrant> {
    async fn insert(&self, token: String, grant: RefreshGrant) -> StoreResult<()> {
        self.put(token, grant).await;
        Ok(())
    }

    async fn rotate(
        &self,
        token: &str,
        now: DateTime<Utc>,
        check: GrantCheck<'_, RefreshGrant>,
        replacement: String,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Redemption<RefreshGrant>> {
        let outcome = self
            .take_with(token, now, check, move |entries, old| {
                let mut next = old.clone();
                next.expires_at = expires_at;
                entries.insert(replacement, next);
            })
            .await;
        Ok(outcome)
    }

    async fn revoke(&self, token: &str) -> StoreResult<bool> {
        Ok(self.entries.write().await.remove(token).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        Ok(self.purge(now).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::oauth::types::CodeChallengeMethod;
    use chrono::Duration;
    use std::sync::Arc;

    fn code_grant(expires_at: DateTime<Utc>) -> AuthorizationGrant {
        AuthorizationGrant {
            client_id: "c1".into(),
            user_id: 1,
            redirect_uri: "https://cb".into(),
            scope: "read".into(),
            code_challenge: None,
            code_challenge_method: CodeChallengeMethod::None,
            expires_at,
        }
    }

    fn refresh_grant(expires_at: DateTime<Utc>) -> RefreshGrant {
        RefreshGrant {
            client_id: "c1".into(),
            user_id: 1,
            scope: "read".into(),
            expires_at,
        }
    }

    fn accept<G>(_: &G) -> Result<(), &'static str> {
        Ok(())
    }

    #[tokio::test]
    async fn test_code_redeems_once() {
        let ledger = MemoryLedger::new();
        let now = Utc::now();
        AuthCodeLedger::insert(&ledger, "abc".into(), code_grant(now + Duration::minutes(10)))
            .await
            .unwrap();

        let first = ledger.redeem("abc", now, &accept::<AuthorizationGrant>).await.unwrap();
        assert!(matches!(first, Redemption::Redeemed(g) if g.client_id == "c1"));

        let second = ledger.redeem("abc", now, &accept::<AuthorizationGrant>).await.unwrap();
        assert_eq!(second, Redemption::Unknown);
    }

    #[tokio::test]
    async fn test_expired_code_is_purged_on_detection() {
        let ledger = MemoryLedger::new();
        let now = Utc::now();
        AuthCodeLedger::insert(&ledger, "abc".into(), code_grant(now - Duration::seconds(1)))
            .await
            .unwrap();

        assert_eq!(ledger.redeem("abc", now, &accept::<AuthorizationGrant>).await.unwrap(), Redemption::Expired);
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_rejected_check_keeps_code() {
        let ledger = MemoryLedger::new();
        let now = Utc::now();
        AuthCodeLedger::insert(&ledger, "abc".into(), code_grant(now + Duration::minutes(10)))
            .await
            .unwrap();

        let reject = |_: &AuthorizationGrant| Err("redirect_uri mismatch");
        let outcome = ledger.redeem("abc", now, &reject).await.unwrap();
        assert_eq!(outcome, Redemption::Rejected("redirect_uri mismatch"));
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_rotation_replaces_token() {
        let ledger = MemoryLedger::new();
        let now = Utc::now();
        RefreshLedger::insert(&ledger, "old".into(), refresh_grant(now + Duration::days(1)))
            .await
            .unwrap();

        let later = now + Duration::days(30);
        let outcome = ledger.rotate("old", now, &accept::<RefreshGrant>, "new".into(), later).await.unwrap();
        assert!(matches!(outcome, Redemption::Redeemed(_)));

        let reuse = ledger.rotate("old", now, &accept::<RefreshGrant>, "other".into(), later).await.unwrap();
        assert_eq!(reuse, Redemption::Unknown);

        let next = ledger.rotate("new", now, &accept::<RefreshGrant>, "newer".into(), later).await.unwrap();
        assert!(matches!(next, Redemption::Redeemed(g) if g.expires_at == later));
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_revoke() {
        let ledger = MemoryLedger::new();
        RefreshLedger::insert(&ledger, "t".into(), refresh_grant(Utc::now() + Duration::days(1)))
            .await
            .unwrap();
        assert!(ledger.revoke("t").await.unwrap());
        assert!(!ledger.revoke("t").await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let ledger = MemoryLedger::new();
        let now = Utc::now();
        AuthCodeLedger::insert(&ledger, "live".into(), code_grant(now + Duration::minutes(1)))
            .await
            .unwrap();
        AuthCodeLedger::insert(&ledger, "dead".into(), code_grant(now - Duration::minutes(1)))
            .await
            .unwrap();

        assert_eq!(AuthCodeLedger::purge_expired(&ledger, now).await.unwrap(), 1);
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_redemption_succeeds_once() {
        let ledger = Arc::new(MemoryLedger::new());
        let now = Utc::now();
        AuthCodeLedger::insert(&*ledger, "abc".into(), code_grant(now + Duration::minutes(10)))
            .await
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move { ledger.redeem("abc", now, &accept::<AuthorizationGrant>).await.unwrap() })
            })
            .collect();

        let mut redeemed = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), Redemption::Redeemed(_)) {
                redeemed += 1;
            }
        }
        assert_eq!(redeemed, 1);
    }
}
