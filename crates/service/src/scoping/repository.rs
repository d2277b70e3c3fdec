use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{SessionRecord, SessionStatus};
use super::errors::ScopingError;
use crate::auth::domain::NewSite;

/// Repository abstraction for scoping-session persistence.
///
/// Status transitions carry the status the caller observed and must apply
/// conditionally: the write lands only if the stored status still equals
/// `expected`, otherwise the method fails with `StateConflict`. Two
/// concurrent writers therefore cannot both commit the same transition.
/// [`deliver`](SessionRepository::deliver) additionally applies the site
/// insert and the session patch as one transactional unit: a site without a
/// live session pointing at it is orphaned and undiscoverable.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find(&self, session_id: &str) -> Result<Option<SessionRecord>, ScopingError>;
    /// Idempotent: a known id returns the existing record untouched.
    async fn create_if_missing(&self, session_id: &str) -> Result<SessionRecord, ScopingError>;
    /// Bump `updated_at` only (a message was recorded against the session).
    async fn touch(&self, session_id: &str) -> Result<SessionRecord, ScopingError>;
    async fn update_brief(
        &self,
        session_id: &str,
        brief_data: &str,
    ) -> Result<SessionRecord, ScopingError>;
    async fn mark_submitted(
        &self,
        session_id: &str,
        email: &str,
        user_id: &str,
        expected: SessionStatus,
    ) -> Result<SessionRecord, ScopingError>;
    async fn mark_approved(
        &self,
        session_id: &str,
        ticket_id: Option<Uuid>,
        expected: SessionStatus,
    ) -> Result<SessionRecord, ScopingError>;
    async fn mark_rejected(
        &self,
        session_id: &str,
        reason: Option<&str>,
        expected: SessionStatus,
    ) -> Result<SessionRecord, ScopingError>;
    /// Operator-driven intermediate statuses (`building`, `review`).
    async fn set_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        expected: SessionStatus,
    ) -> Result<SessionRecord, ScopingError>;
    /// Atomic provisioning: insert `site` and mark the session `live` with
    /// the URLs and new site id, all or nothing.
    async fn deliver(
        &self,
        session_id: &str,
        repo_url: &str,
        deploy_url: &str,
        site: NewSite,
        expected: SessionStatus,
    ) -> Result<SessionRecord, ScopingError>;
    async fn list_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<SessionRecord>, ScopingError>;
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<SessionRecord>, ScopingError>;
}

/// In-memory mock for engine tests. Shares a `MockSiteRepository` so the
/// deliver transition lands sites where the auth tests can see them.
pub mod mock {
    use super::*;
    use crate::auth::repository::mock::MockSiteRepository;
    use crate::auth::repository::SiteRepository;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    pub struct MockSessionRepository {
        sessions: Mutex<HashMap<String, SessionRecord>>,
        pub sites: Arc<MockSiteRepository>,
    }

    impl MockSessionRepository {
        pub fn new(sites: Arc<MockSiteRepository>) -> Self {
            Self { sessions: Mutex::new(HashMap::new()), sites }
        }

        fn with_session<F>(&self, session_id: &str, f: F) -> Result<SessionRecord, ScopingError>
        where
            F: FnOnce(&mut SessionRecord),
        {
            let mut sessions = self.sessions.lock().unwrap();
            let record = sessions.get_mut(session_id).ok_or(ScopingError::NotFound)?;
            f(record);
            record.updated_at = Utc::now();
            Ok(record.clone())
        }

        // Conditional transition under the lock, mirroring the CAS write of
        // the SQL backend.
        fn transition<F>(
            &self,
            session_id: &str,
            expected: SessionStatus,
            to: SessionStatus,
            f: F,
        ) -> Result<SessionRecord, ScopingError>
        where
            F: FnOnce(&mut SessionRecord),
        {
            let mut sessions = self.sessions.lock().unwrap();
            let record = sessions.get_mut(session_id).ok_or(ScopingError::NotFound)?;
            if record.status != expected {
                return Err(ScopingError::StateConflict { from: record.status, to });
            }
            record.status = to;
            f(record);
            record.updated_at = Utc::now();
            Ok(record.clone())
        }
    }

    #[async_trait]
    impl SessionRepository for MockSessionRepository {
        async fn find(&self, session_id: &str) -> Result<Option<SessionRecord>, ScopingError> {
            Ok(self.sessions.lock().unwrap().get(session_id).cloned())
        }

        async fn create_if_missing(
            &self,
            session_id: &str,
        ) -> Result<SessionRecord, ScopingError> {
            if session_id.trim().is_empty() {
                return Err(ScopingError::Validation("session_id required".into()));
            }
            let mut sessions = self.sessions.lock().unwrap();
            if let Some(existing) = sessions.get(session_id) {
                return Ok(existing.clone());
            }
            let now = Utc::now();
            let record = SessionRecord {
                session_id: session_id.to_string(),
                status: SessionStatus::Active,
                brief_data: None,
                email: None,
                user_id: None,
                rejection_reason: None,
                ticket_id: None,
                repo_url: None,
                deploy_url: None,
                site_id: None,
                created_at: now,
                updated_at: now,
            };
            sessions.insert(session_id.to_string(), record.clone());
            Ok(record)
        }

        async fn touch(&self, session_id: &str) -> Result<SessionRecord, ScopingError> {
            self.with_session(session_id, |_| {})
        }

        async fn update_brief(
            &self,
            session_id: &str,
            brief_data: &str,
        ) -> Result<SessionRecord, ScopingError> {
            self.with_session(session_id, |s| s.brief_data = Some(brief_data.to_string()))
        }

        async fn mark_submitted(
            &self,
            session_id: &str,
            email: &str,
            user_id: &str,
            expected: SessionStatus,
        ) -> Result<SessionRecord, ScopingError> {
            self.transition(session_id, expected, SessionStatus::Submitted, |s| {
                s.email = Some(email.to_string());
                s.user_id = Some(user_id.to_string());
            })
        }

        async fn mark_approved(
            &self,
            session_id: &str,
            ticket_id: Option<Uuid>,
            expected: SessionStatus,
        ) -> Result<SessionRecord, ScopingError> {
            self.transition(session_id, expected, SessionStatus::Approved, |s| {
                if ticket_id.is_some() {
                    s.ticket_id = ticket_id;
                }
            })
        }

        async fn mark_rejected(
            &self,
            session_id: &str,
            reason: Option<&str>,
            expected: SessionStatus,
        ) -> Result<SessionRecord, ScopingError> {
            self.transition(session_id, expected, SessionStatus::Rejected, |s| {
                s.rejection_reason = reason.map(str::to_string);
            })
        }

        async fn set_status(
            &self,
            session_id: &str,
            status: SessionStatus,
            expected: SessionStatus,
        ) -> Result<SessionRecord, ScopingError> {
            self.transition(session_id, expected, status, |_| {})
        }

        async fn deliver(
            &self,
            session_id: &str,
            repo_url: &str,
            deploy_url: &str,
            site: NewSite,
            expected: SessionStatus,
        ) -> Result<SessionRecord, ScopingError> {
            // Session existence and status are checked before the site
            // insert so a bad session id or a lost race cannot leave an
            // orphaned site behind.
            {
                let sessions = self.sessions.lock().unwrap();
                let record = sessions.get(session_id).ok_or(ScopingError::NotFound)?;
                if record.status != expected {
                    return Err(ScopingError::StateConflict {
                        from: record.status,
                        to: SessionStatus::Live,
                    });
                }
            }
            let site_id = site.site_id.clone();
            self.sites
                .create(site)
                .await
                .map_err(|e| ScopingError::Repository(e.to_string()))?;
            self.transition(session_id, expected, SessionStatus::Live, |s| {
                s.repo_url = Some(repo_url.to_string());
                s.deploy_url = Some(deploy_url.to_string());
                s.site_id = Some(site_id);
            })
        }

        async fn list_by_status(
            &self,
            status: SessionStatus,
        ) -> Result<Vec<SessionRecord>, ScopingError> {
            let sessions = self.sessions.lock().unwrap();
            Ok(sessions.values().filter(|s| s.status == status).cloned().collect())
        }

        async fn list_by_user(&self, user_id: &str) -> Result<Vec<SessionRecord>, ScopingError> {
            let sessions = self.sessions.lock().unwrap();
            Ok(sessions
                .values()
                .filter(|s| s.user_id.as_deref() == Some(user_id))
                .cloned()
                .collect())
        }
    }
}
