use async_trait::async_trait;

use super::domain::{NewSite, SiteRecord, SiteUpdate};
use super::errors::AuthError;

/// Repository abstraction for site persistence. Lookup by token digest is the
/// authentication hot path; lookup by site id serves the admin surface and
/// the deliver pre-check.
#[async_trait]
pub trait SiteRepository: Send + Sync {
    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<SiteRecord>, AuthError>;
    async fn find_by_site_id(&self, site_id: &str) -> Result<Option<SiteRecord>, AuthError>;
    async fn create(&self, site: NewSite) -> Result<SiteRecord, AuthError>;
    async fn update(&self, site_id: &str, patch: SiteUpdate) -> Result<SiteRecord, AuthError>;
    async fn list(&self) -> Result<Vec<SiteRecord>, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockSiteRepository {
        sites: Mutex<HashMap<String, SiteRecord>>, // key: site_id
    }

    impl MockSiteRepository {
        /// Test helper: insert a site without going through validation.
        pub fn seed(&self, record: SiteRecord) {
            self.sites.lock().unwrap().insert(record.site_id.clone(), record);
        }
    }

    #[async_trait]
    impl SiteRepository for MockSiteRepository {
        async fn find_by_token_hash(
            &self,
            token_hash: &str,
        ) -> Result<Option<SiteRecord>, AuthError> {
            let sites = self.sites.lock().unwrap();
            Ok(sites.values().find(|s| s.token_hash == token_hash).cloned())
        }

        async fn find_by_site_id(&self, site_id: &str) -> Result<Option<SiteRecord>, AuthError> {
            let sites = self.sites.lock().unwrap();
            Ok(sites.get(site_id).cloned())
        }

        async fn create(&self, site: NewSite) -> Result<SiteRecord, AuthError> {
            let mut sites = self.sites.lock().unwrap();
            if sites.contains_key(&site.site_id) {
                return Err(AuthError::Conflict);
            }
            if sites.values().any(|s| s.token_hash == site.token_hash) {
                return Err(AuthError::Conflict);
            }
            let record = SiteRecord {
                site_id: site.site_id.clone(),
                name: site.name,
                domain: site.domain,
                repo: site.repo,
                token_hash: site.token_hash,
                client_name: site.client_name,
                client_email: site.client_email,
                active: true,
                system_prompt: None,
                created_at: Utc::now(),
            };
            sites.insert(site.site_id, record.clone());
            Ok(record)
        }

        async fn update(&self, site_id: &str, patch: SiteUpdate) -> Result<SiteRecord, AuthError> {
            let mut sites = self.sites.lock().unwrap();
            let record = sites.get_mut(site_id).ok_or(AuthError::NotFound)?;
            if let Some(v) = patch.name {
                record.name = v;
            }
            if let Some(v) = patch.domain {
                record.domain = v;
            }
            if let Some(v) = patch.repo {
                record.repo = Some(v);
            }
            if let Some(v) = patch.client_name {
                record.client_name = v;
            }
            if let Some(v) = patch.client_email {
                record.client_email = Some(v);
            }
            if let Some(v) = patch.active {
                record.active = v;
            }
            if let Some(v) = patch.system_prompt {
                record.system_prompt = Some(v);
            }
            Ok(record.clone())
        }

        async fn list(&self) -> Result<Vec<SiteRecord>, AuthError> {
            let sites = self.sites.lock().unwrap();
            Ok(sites.values().cloned().collect())
        }
    }
}
