use std::sync::Arc;

use tracing::{debug, instrument};

use super::domain::AuthedSite;
use super::errors::AuthError;
use super::repository::SiteRepository;
use crate::token;

/// Resolves raw bearer tokens to verified site identities.
///
/// Pure read: hashes the token, looks the digest up, checks the active flag.
/// Absent token, unknown digest and deactivated site are indistinguishable to
/// the caller.
pub struct SiteAuthService {
    repo: Arc<dyn SiteRepository>,
}

impl SiteAuthService {
    pub fn new(repo: Arc<dyn SiteRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self, raw_token))]
    pub async fn verify(&self, raw_token: &str) -> Result<AuthedSite, AuthError> {
        if raw_token.trim().is_empty() {
            return Err(AuthError::Unauthorized);
        }
        let hash = token::digest(raw_token);
        let site = self
            .repo
            .find_by_token_hash(&hash)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        if !site.active {
            debug!(site_id = %site.site_id, "token matches a deactivated site");
            return Err(AuthError::Unauthorized);
        }
        Ok(site.into())
    }
}

/// Operator trust domain: a single static shared secret compared for exact
/// equality against an `Authorization: Bearer <secret>` header. Intentionally
/// simpler than site tokens (no hashing, no revocation); an empty configured
/// secret rejects everything.
#[derive(Clone)]
pub struct AgentAuth {
    secret: String,
}

impl AgentAuth {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn verify_header(&self, authorization: Option<&str>) -> Result<(), AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::Unauthorized);
        }
        match authorization {
            Some(value) if value == format!("Bearer {}", self.secret) => Ok(()),
            _ => Err(AuthError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::domain::NewSite;
    use crate::auth::repository::mock::MockSiteRepository;

    async fn seeded_repo(raw_token: &str) -> Arc<MockSiteRepository> {
        let repo = Arc::new(MockSiteRepository::default());
        repo.create(NewSite {
            site_id: "acme".into(),
            name: "Acme".into(),
            domain: "acme.example.com".into(),
            repo: None,
            token_hash: token::digest(raw_token),
            client_name: "Acme Inc".into(),
            client_email: None,
        })
        .await
        .unwrap();
        repo
    }

    #[tokio::test]
    async fn valid_token_resolves_site() {
        let repo = seeded_repo("T1").await;
        let svc = SiteAuthService::new(repo);
        let authed = svc.verify("T1").await.unwrap();
        assert_eq!(authed.site_id, "acme");
        assert_eq!(authed.name, "Acme");
    }

    #[tokio::test]
    async fn unknown_and_empty_tokens_are_unauthorized() {
        let repo = seeded_repo("T1").await;
        let svc = SiteAuthService::new(repo);
        assert!(matches!(svc.verify("nope").await, Err(AuthError::Unauthorized)));
        assert!(matches!(svc.verify("").await, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn deactivation_revokes_immediately() {
        let repo = seeded_repo("T1").await;
        let svc = SiteAuthService::new(repo.clone());
        assert!(svc.verify("T1").await.is_ok());

        repo.update(
            "acme",
            crate::auth::domain::SiteUpdate { active: Some(false), ..Default::default() },
        )
        .await
        .unwrap();
        assert!(matches!(svc.verify("T1").await, Err(AuthError::Unauthorized)));
    }

    #[test]
    fn agent_secret_exact_match_only() {
        let auth = AgentAuth::new("s3cret".into());
        assert!(auth.verify_header(Some("Bearer s3cret")).is_ok());
        assert!(auth.verify_header(Some("Bearer wrong")).is_err());
        assert!(auth.verify_header(Some("s3cret")).is_err());
        assert!(auth.verify_header(None).is_err());
    }

    #[test]
    fn empty_agent_secret_rejects_everything() {
        let auth = AgentAuth::new(String::new());
        assert!(auth.verify_header(Some("Bearer ")).is_err());
        assert!(auth.verify_header(Some("Bearer anything")).is_err());
    }
}
