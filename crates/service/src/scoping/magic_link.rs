//! Magic-link issuance and redemption.
//!
//! A grant is a short-lived, single-use proof that a party controls an email
//! address. It is entirely independent of site bearer tokens: redeeming a
//! grant never yields tenant access, only the email identity used by the
//! scoping dashboard and submit step.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::instrument;
use uuid::Uuid;

use super::domain::ScopeUser;
use super::errors::ScopingError;
use crate::token;

/// Fixed absolute lifetime of a grant.
pub const GRANT_TTL_MINUTES: i64 = 15;

/// Persistence for scope users and their single live grant per email.
#[async_trait]
pub trait GrantRepository: Send + Sync {
    /// Find or create the user row for an email; leaves any grant alone.
    async fn ensure_user(&self, email: &str) -> Result<ScopeUser, ScopingError>;
    /// Overwrite the grant for an email, invalidating any prior token.
    async fn store_grant(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<ScopeUser, ScopingError>;
    async fn find_by_token(&self, token: &str) -> Result<Option<ScopeUser>, ScopingError>;
    /// Atomically consume the grant, keyed on the token value. Returns
    /// `false` when the token was no longer live, so of two concurrent
    /// redemptions exactly one sees `true`.
    async fn consume_grant(&self, token: &str) -> Result<bool, ScopingError>;
}

/// Grant handed back to the caller. Transport to the end user is an external
/// collaborator concern.
#[derive(Debug, Clone)]
pub struct IssuedGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Identity proven by a redeemed grant.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VerifiedEmail {
    pub email: String,
    pub user_id: Uuid,
}

pub struct MagicLinkIssuer {
    repo: Arc<dyn GrantRepository>,
}

impl MagicLinkIssuer {
    pub fn new(repo: Arc<dyn GrantRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn issue(&self, email: &str) -> Result<IssuedGrant, ScopingError> {
        if !email.contains('@') {
            return Err(ScopingError::Validation("invalid email".into()));
        }
        let token = token::generate();
        let expires_at = Utc::now() + Duration::minutes(GRANT_TTL_MINUTES);
        self.repo.store_grant(email, &token, expires_at).await?;
        Ok(IssuedGrant { token, expires_at })
    }

    /// Single use: success clears the grant. An expired grant is reported as
    /// such but not consumed, so the caller may re-issue.
    #[instrument(skip(self, raw_token))]
    pub async fn redeem(&self, raw_token: &str) -> Result<VerifiedEmail, ScopingError> {
        if raw_token.trim().is_empty() {
            return Err(ScopingError::Validation("token required".into()));
        }
        let user = self
            .repo
            .find_by_token(raw_token)
            .await?
            .ok_or(ScopingError::NotFound)?;
        let expires_at = user.token_expires_at.ok_or(ScopingError::NotFound)?;
        if Utc::now() > expires_at {
            return Err(ScopingError::Expired);
        }
        // The consume is the linearization point: a concurrent redemption of
        // the same token loses here even though both passed the lookup.
        if !self.repo.consume_grant(raw_token).await? {
            return Err(ScopingError::NotFound);
        }
        Ok(VerifiedEmail { email: user.email, user_id: user.id })
    }
}

/// In-memory mock grant store for tests.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockGrantRepository {
        users: Mutex<HashMap<String, ScopeUser>>, // key: email
    }

    impl MockGrantRepository {
        /// Test helper: backdate the grant expiry for an email.
        pub fn force_expiry(&self, email: &str, expires_at: DateTime<Utc>) {
            let mut users = self.users.lock().unwrap();
            if let Some(u) = users.get_mut(email) {
                u.token_expires_at = Some(expires_at);
            }
        }
    }

    #[async_trait]
    impl GrantRepository for MockGrantRepository {
        async fn ensure_user(&self, email: &str) -> Result<ScopeUser, ScopingError> {
            let email = email.trim().to_lowercase();
            if !email.contains('@') {
                return Err(ScopingError::Validation("invalid email".into()));
            }
            let mut users = self.users.lock().unwrap();
            let user = users.entry(email.clone()).or_insert_with(|| ScopeUser {
                id: Uuid::new_v4(),
                email,
                login_token: None,
                token_expires_at: None,
            });
            Ok(user.clone())
        }

        async fn store_grant(
            &self,
            email: &str,
            token: &str,
            expires_at: DateTime<Utc>,
        ) -> Result<ScopeUser, ScopingError> {
            let email = email.trim().to_lowercase();
            let mut users = self.users.lock().unwrap();
            let user = users.entry(email.clone()).or_insert_with(|| ScopeUser {
                id: Uuid::new_v4(),
                email,
                login_token: None,
                token_expires_at: None,
            });
            user.login_token = Some(token.to_string());
            user.token_expires_at = Some(expires_at);
            Ok(user.clone())
        }

        async fn find_by_token(&self, token: &str) -> Result<Option<ScopeUser>, ScopingError> {
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|u| u.login_token.as_deref() == Some(token)).cloned())
        }

        async fn consume_grant(&self, token: &str) -> Result<bool, ScopingError> {
            let mut users = self.users.lock().unwrap();
            for u in users.values_mut() {
                if u.login_token.as_deref() == Some(token) {
                    u.login_token = None;
                    u.token_expires_at = None;
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockGrantRepository;
    use super::*;

    fn issuer() -> (Arc<MockGrantRepository>, MagicLinkIssuer) {
        let repo = Arc::new(MockGrantRepository::default());
        let issuer = MagicLinkIssuer::new(repo.clone());
        (repo, issuer)
    }

    #[tokio::test]
    async fn redeem_succeeds_exactly_once() {
        let (_, issuer) = issuer();
        let grant = issuer.issue("a@b.com").await.unwrap();

        let verified = issuer.redeem(&grant.token).await.unwrap();
        assert_eq!(verified.email, "a@b.com");

        // Replay must fail as not-found, the grant was consumed.
        assert!(matches!(issuer.redeem(&grant.token).await, Err(ScopingError::NotFound)));
    }

    #[tokio::test]
    async fn unissued_token_is_not_found() {
        let (_, issuer) = issuer();
        issuer.issue("a@b.com").await.unwrap();
        assert!(matches!(issuer.redeem("some-other-token").await, Err(ScopingError::NotFound)));
    }

    #[tokio::test]
    async fn expired_grant_fails_but_is_not_consumed() {
        let (repo, issuer) = issuer();
        let grant = issuer.issue("a@b.com").await.unwrap();
        repo.force_expiry("a@b.com", Utc::now() - Duration::minutes(1));

        assert!(matches!(issuer.redeem(&grant.token).await, Err(ScopingError::Expired)));
        // The grant is still there; re-issuing works and the new token redeems.
        let fresh = issuer.issue("a@b.com").await.unwrap();
        assert!(issuer.redeem(&fresh.token).await.is_ok());
    }

    #[tokio::test]
    async fn reissue_invalidates_prior_grant() {
        let (_, issuer) = issuer();
        let first = issuer.issue("a@b.com").await.unwrap();
        let second = issuer.issue("a@b.com").await.unwrap();
        assert_ne!(first.token, second.token);

        assert!(matches!(issuer.redeem(&first.token).await, Err(ScopingError::NotFound)));
        assert!(issuer.redeem(&second.token).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_redemptions_consume_at_most_once() {
        let (repo, issuer) = issuer();
        let grant = issuer.issue("a@b.com").await.unwrap();

        // Two redeemers can both pass the lookup; only the first consume
        // wins, the loser resolves to not-found.
        assert!(repo.consume_grant(&grant.token).await.unwrap());
        assert!(!repo.consume_grant(&grant.token).await.unwrap());
        assert!(matches!(issuer.redeem(&grant.token).await, Err(ScopingError::NotFound)));
    }

    #[tokio::test]
    async fn issue_rejects_invalid_email() {
        let (_, issuer) = issuer();
        assert!(matches!(
            issuer.issue("not-an-email").await,
            Err(ScopingError::Validation(_))
        ));
    }
}
