//! Relay message flow between embedded site widgets and the agent.
//!
//! Messages arrive already scoped: handlers resolve the site from its bearer
//! token before calling in, so nothing here ever trusts a caller-supplied
//! site id on the site-facing path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Serialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub site_id: String,
    pub role: String,
    pub content: String,
    pub status: String,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Record a message. `status` is `pending` for visitor messages awaiting
    /// the agent, `sent` for agent replies.
    async fn post(
        &self,
        site_id: &str,
        role: &str,
        content: &str,
        status: &str,
        metadata: Option<String>,
    ) -> Result<MessageRecord, ServiceError>;
    /// Newest-first history for one site.
    async fn list(&self, site_id: &str, limit: u64) -> Result<Vec<MessageRecord>, ServiceError>;
    /// Unhandled messages in arrival order, optionally scoped to one site.
    async fn pending(&self, site_id: Option<&str>) -> Result<Vec<MessageRecord>, ServiceError>;
    async fn set_status(
        &self,
        id: Uuid,
        status: &str,
        metadata: Option<String>,
    ) -> Result<(), ServiceError>;
}

pub struct SeaOrmMessageStore {
    pub db: DatabaseConnection,
}

fn to_record(m: models::message::Model) -> MessageRecord {
    MessageRecord {
        id: m.id,
        site_id: m.site_id,
        role: m.role,
        content: m.content,
        status: m.status,
        metadata: m.metadata,
        created_at: m.created_at.into(),
    }
}

#[async_trait]
impl MessageStore for SeaOrmMessageStore {
    async fn post(
        &self,
        site_id: &str,
        role: &str,
        content: &str,
        status: &str,
        metadata: Option<String>,
    ) -> Result<MessageRecord, ServiceError> {
        let m = models::message::create(&self.db, site_id, role, content, status, metadata).await?;
        Ok(to_record(m))
    }

    async fn list(&self, site_id: &str, limit: u64) -> Result<Vec<MessageRecord>, ServiceError> {
        let all = models::message::list(&self.db, site_id, limit).await?;
        Ok(all.into_iter().map(to_record).collect())
    }

    async fn pending(&self, site_id: Option<&str>) -> Result<Vec<MessageRecord>, ServiceError> {
        let all = models::message::pending(&self.db, site_id).await?;
        Ok(all.into_iter().map(to_record).collect())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: &str,
        metadata: Option<String>,
    ) -> Result<(), ServiceError> {
        models::message::update_status(&self.db, id, status, metadata).await?;
        Ok(())
    }
}

/// In-memory mock store for handler tests.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockMessageStore {
        messages: Mutex<Vec<MessageRecord>>,
    }

    #[async_trait]
    impl MessageStore for MockMessageStore {
        async fn post(
            &self,
            site_id: &str,
            role: &str,
            content: &str,
            status: &str,
            metadata: Option<String>,
        ) -> Result<MessageRecord, ServiceError> {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                return Err(ServiceError::Validation("content required".into()));
            }
            if trimmed.len() > models::message::MAX_CONTENT_LEN {
                return Err(ServiceError::Validation("content too long".into()));
            }
            let record = MessageRecord {
                id: Uuid::new_v4(),
                site_id: site_id.to_string(),
                role: role.to_string(),
                content: trimmed.to_string(),
                status: status.to_string(),
                metadata,
                created_at: Utc::now(),
            };
            self.messages.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn list(
            &self,
            site_id: &str,
            limit: u64,
        ) -> Result<Vec<MessageRecord>, ServiceError> {
            let messages = self.messages.lock().unwrap();
            let mut out: Vec<_> =
                messages.iter().filter(|m| m.site_id == site_id).cloned().collect();
            out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            out.truncate(limit as usize);
            Ok(out)
        }

        async fn pending(&self, site_id: Option<&str>) -> Result<Vec<MessageRecord>, ServiceError> {
            let messages = self.messages.lock().unwrap();
            let mut out: Vec<_> = messages
                .iter()
                .filter(|m| m.status == "pending")
                .filter(|m| site_id.map_or(true, |s| m.site_id == s))
                .cloned()
                .collect();
            out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(out)
        }

        async fn set_status(
            &self,
            id: Uuid,
            status: &str,
            metadata: Option<String>,
        ) -> Result<(), ServiceError> {
            let mut messages = self.messages.lock().unwrap();
            let record = messages
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or_else(|| ServiceError::not_found("message"))?;
            record.status = status.to_string();
            if metadata.is_some() {
                record.metadata = metadata;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockMessageStore;
    use super::*;

    #[tokio::test]
    async fn post_trims_and_validates() {
        let store = MockMessageStore::default();
        let m = store.post("acme", "user", "  hello  ", "pending", None).await.unwrap();
        assert_eq!(m.content, "hello");

        let err = store.post("acme", "user", "   ", "pending", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let long = "x".repeat(models::message::MAX_CONTENT_LEN + 1);
        let err = store.post("acme", "user", &long, "pending", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn pending_scopes_by_site_and_clears_after_handling() {
        let store = MockMessageStore::default();
        let m = store.post("acme", "user", "help", "pending", None).await.unwrap();
        store.post("other", "user", "hi", "pending", None).await.unwrap();
        store.post("acme", "agent", "on it", "sent", None).await.unwrap();

        let pending = store.pending(Some("acme")).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, m.id);

        store.set_status(m.id, "handled", None).await.unwrap();
        assert!(store.pending(Some("acme")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_status_unknown_message_is_not_found() {
        let store = MockMessageStore::default();
        let err = store.set_status(Uuid::new_v4(), "handled", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
