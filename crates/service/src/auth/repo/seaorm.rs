use sea_orm::DatabaseConnection;

use crate::auth::domain::{NewSite, SiteRecord, SiteUpdate};
use crate::auth::errors::AuthError;
use crate::auth::repository::SiteRepository;

pub struct SeaOrmSiteRepository {
    pub db: DatabaseConnection,
}

fn to_record(m: models::site::Model) -> SiteRecord {
    SiteRecord {
        site_id: m.site_id,
        name: m.name,
        domain: m.domain,
        repo: m.repo,
        token_hash: m.token_hash,
        client_name: m.client_name,
        client_email: m.client_email,
        active: m.active,
        system_prompt: m.system_prompt,
        created_at: m.created_at.into(),
    }
}

fn map_model_err(e: models::errors::ModelError) -> AuthError {
    match e {
        models::errors::ModelError::Validation(msg) => AuthError::Validation(msg),
        models::errors::ModelError::NotFound(_) => AuthError::NotFound,
        models::errors::ModelError::Db(msg) => AuthError::Repository(msg),
    }
}

#[async_trait::async_trait]
impl SiteRepository for SeaOrmSiteRepository {
    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<SiteRecord>, AuthError> {
        let res = models::site::find_by_token_hash(&self.db, token_hash)
            .await
            .map_err(map_model_err)?;
        Ok(res.map(to_record))
    }

    async fn find_by_site_id(&self, site_id: &str) -> Result<Option<SiteRecord>, AuthError> {
        let res = models::site::find_by_site_id(&self.db, site_id)
            .await
            .map_err(map_model_err)?;
        Ok(res.map(to_record))
    }

    async fn create(&self, site: NewSite) -> Result<SiteRecord, AuthError> {
        if models::site::find_by_site_id(&self.db, &site.site_id)
            .await
            .map_err(map_model_err)?
            .is_some()
        {
            return Err(AuthError::Conflict);
        }
        let input = models::site::NewSite {
            site_id: site.site_id,
            name: site.name,
            domain: site.domain,
            repo: site.repo,
            token_hash: site.token_hash,
            client_name: site.client_name,
            client_email: site.client_email,
        };
        let created = models::site::create(&self.db, &input).await.map_err(map_model_err)?;
        Ok(to_record(created))
    }

    async fn update(&self, site_id: &str, patch: SiteUpdate) -> Result<SiteRecord, AuthError> {
        let patch = models::site::SiteUpdate {
            name: patch.name,
            domain: patch.domain,
            repo: patch.repo,
            client_name: patch.client_name,
            client_email: patch.client_email,
            active: patch.active,
            system_prompt: patch.system_prompt,
        };
        let updated = models::site::update_fields(&self.db, site_id, patch)
            .await
            .map_err(map_model_err)?;
        Ok(to_record(updated))
    }

    async fn list(&self) -> Result<Vec<SiteRecord>, AuthError> {
        let all = models::site::list(&self.db).await.map_err(map_model_err)?;
        Ok(all.into_iter().map(to_record).collect())
    }
}
