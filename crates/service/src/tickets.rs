//! Ticket workflows: site-scoped creation and operator triage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Serialize)]
pub struct TicketRecord {
    pub id: Uuid,
    pub site_id: String,
    pub title: String,
    pub description: String,
    pub kind: String,
    pub priority: String,
    pub status: String,
    pub page_url: Option<String>,
    pub screenshot: Option<String>,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new ticket. `priority` defaults to `medium`; status always
/// starts at `open`.
#[derive(Debug, Clone)]
pub struct TicketDraft {
    pub site_id: String,
    pub title: String,
    pub description: String,
    pub kind: String,
    pub priority: Option<String>,
    pub page_url: Option<String>,
    pub screenshot: Option<String>,
    pub metadata: Option<String>,
    /// Token digest of the creating site; empty for operator-created tickets.
    pub client_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketPatch {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<String>,
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn create(&self, draft: TicketDraft) -> Result<TicketRecord, ServiceError>;
    async fn get(&self, id: Uuid) -> Result<Option<TicketRecord>, ServiceError>;
    /// Filtered, newest-first listing for the site and agent surfaces.
    async fn list(
        &self,
        site_id: Option<&str>,
        status: Option<&str>,
        limit: u64,
    ) -> Result<Vec<TicketRecord>, ServiceError>;
    async fn list_all(&self) -> Result<Vec<TicketRecord>, ServiceError>;
    async fn update(&self, id: Uuid, patch: TicketPatch) -> Result<TicketRecord, ServiceError>;
}

pub struct SeaOrmTicketStore {
    pub db: DatabaseConnection,
}

fn to_record(m: models::ticket::Model) -> TicketRecord {
    TicketRecord {
        id: m.id,
        site_id: m.site_id,
        title: m.title,
        description: m.description,
        kind: m.kind,
        priority: m.priority,
        status: m.status,
        page_url: m.page_url,
        screenshot: m.screenshot,
        metadata: m.metadata,
        created_at: m.created_at.into(),
        updated_at: m.updated_at.into(),
    }
}

#[async_trait]
impl TicketStore for SeaOrmTicketStore {
    async fn create(&self, draft: TicketDraft) -> Result<TicketRecord, ServiceError> {
        let m = models::ticket::create(
            &self.db,
            models::ticket::NewTicket {
                site_id: draft.site_id,
                title: draft.title,
                description: draft.description,
                kind: draft.kind,
                priority: draft.priority,
                page_url: draft.page_url,
                screenshot: draft.screenshot,
                metadata: draft.metadata,
                client_token: draft.client_token,
            },
        )
        .await?;
        Ok(to_record(m))
    }

    async fn get(&self, id: Uuid) -> Result<Option<TicketRecord>, ServiceError> {
        Ok(models::ticket::find_by_id(&self.db, id).await?.map(to_record))
    }

    async fn list(
        &self,
        site_id: Option<&str>,
        status: Option<&str>,
        limit: u64,
    ) -> Result<Vec<TicketRecord>, ServiceError> {
        let all = models::ticket::list(&self.db, site_id, status, limit).await?;
        Ok(all.into_iter().map(to_record).collect())
    }

    async fn list_all(&self) -> Result<Vec<TicketRecord>, ServiceError> {
        let all = models::ticket::list_all(&self.db).await?;
        Ok(all.into_iter().map(to_record).collect())
    }

    async fn update(&self, id: Uuid, patch: TicketPatch) -> Result<TicketRecord, ServiceError> {
        let m = models::ticket::update_fields(
            &self.db,
            id,
            models::ticket::TicketUpdate {
                status: patch.status,
                priority: patch.priority,
                title: patch.title,
                description: patch.description,
                metadata: patch.metadata,
            },
        )
        .await?;
        Ok(to_record(m))
    }
}

/// In-memory mock store for engine and handler tests.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockTicketStore {
        tickets: Mutex<HashMap<Uuid, TicketRecord>>,
    }

    impl MockTicketStore {
        pub fn all(&self) -> Vec<TicketRecord> {
            self.tickets.lock().unwrap().values().cloned().collect()
        }
    }

    #[async_trait]
    impl TicketStore for MockTicketStore {
        async fn create(&self, draft: TicketDraft) -> Result<TicketRecord, ServiceError> {
            if draft.title.trim().is_empty() {
                return Err(ServiceError::Validation("title required".into()));
            }
            if draft.description.trim().is_empty() {
                return Err(ServiceError::Validation("description required".into()));
            }
            if draft.kind.trim().is_empty() {
                return Err(ServiceError::Validation("kind required".into()));
            }
            let now = Utc::now();
            let record = TicketRecord {
                id: Uuid::new_v4(),
                site_id: draft.site_id,
                title: draft.title,
                description: draft.description,
                kind: draft.kind,
                priority: draft.priority.unwrap_or_else(|| "medium".into()),
                status: "open".into(),
                page_url: draft.page_url,
                screenshot: draft.screenshot,
                metadata: draft.metadata,
                created_at: now,
                updated_at: now,
            };
            self.tickets.lock().unwrap().insert(record.id, record.clone());
            Ok(record)
        }

        async fn get(&self, id: Uuid) -> Result<Option<TicketRecord>, ServiceError> {
            Ok(self.tickets.lock().unwrap().get(&id).cloned())
        }

        async fn list(
            &self,
            site_id: Option<&str>,
            status: Option<&str>,
            limit: u64,
        ) -> Result<Vec<TicketRecord>, ServiceError> {
            let tickets = self.tickets.lock().unwrap();
            let mut out: Vec<_> = tickets
                .values()
                .filter(|t| site_id.map_or(true, |s| t.site_id == s))
                .filter(|t| status.map_or(true, |s| t.status == s))
                .cloned()
                .collect();
            out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            out.truncate(limit as usize);
            Ok(out)
        }

        async fn list_all(&self) -> Result<Vec<TicketRecord>, ServiceError> {
            let tickets = self.tickets.lock().unwrap();
            let mut out: Vec<_> = tickets.values().cloned().collect();
            out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(out)
        }

        async fn update(&self, id: Uuid, patch: TicketPatch) -> Result<TicketRecord, ServiceError> {
            let mut tickets = self.tickets.lock().unwrap();
            let record = tickets.get_mut(&id).ok_or_else(|| ServiceError::not_found("ticket"))?;
            if let Some(v) = patch.status {
                record.status = v;
            }
            if let Some(v) = patch.priority {
                record.priority = v;
            }
            if let Some(v) = patch.title {
                record.title = v;
            }
            if let Some(v) = patch.description {
                record.description = v;
            }
            if let Some(v) = patch.metadata {
                record.metadata = Some(v);
            }
            record.updated_at = Utc::now();
            Ok(record.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTicketStore;
    use super::*;

    fn draft(site: &str, title: &str) -> TicketDraft {
        TicketDraft {
            site_id: site.into(),
            title: title.into(),
            description: "something is broken".into(),
            kind: "bug".into(),
            priority: None,
            page_url: None,
            screenshot: None,
            metadata: None,
            client_token: String::new(),
        }
    }

    #[tokio::test]
    async fn create_applies_defaults() {
        let store = MockTicketStore::default();
        let t = store.create(draft("acme", "broken checkout")).await.unwrap();
        assert_eq!(t.priority, "medium");
        assert_eq!(t.status, "open");
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let store = MockTicketStore::default();
        let err = store.create(draft("acme", "   ")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn list_filters_by_site_and_status() {
        let store = MockTicketStore::default();
        let t1 = store.create(draft("acme", "one")).await.unwrap();
        store.create(draft("other", "two")).await.unwrap();
        store
            .update(t1.id, TicketPatch { status: Some("closed".into()), ..Default::default() })
            .await
            .unwrap();

        let open_acme = store.list(Some("acme"), Some("open"), 50).await.unwrap();
        assert!(open_acme.is_empty());
        let closed_acme = store.list(Some("acme"), Some("closed"), 50).await.unwrap();
        assert_eq!(closed_acme.len(), 1);
    }
}
