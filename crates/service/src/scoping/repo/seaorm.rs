use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};
use uuid::Uuid;

use crate::auth::domain::NewSite;
use crate::scoping::domain::{ScopeUser, SessionRecord, SessionStatus};
use crate::scoping::errors::ScopingError;
use crate::scoping::magic_link::GrantRepository;
use crate::scoping::repository::SessionRepository;

pub struct SeaOrmSessionRepository {
    pub db: DatabaseConnection,
}

fn to_record(m: models::scoping_session::Model) -> Result<SessionRecord, ScopingError> {
    let status = SessionStatus::parse(&m.status)
        .ok_or_else(|| ScopingError::Repository(format!("unknown status '{}'", m.status)))?;
    Ok(SessionRecord {
        session_id: m.session_id,
        status,
        brief_data: m.brief_data,
        email: m.email,
        user_id: m.user_id,
        rejection_reason: m.rejection_reason,
        ticket_id: m.ticket_id,
        repo_url: m.repo_url,
        deploy_url: m.deploy_url,
        site_id: m.site_id,
        created_at: m.created_at.into(),
        updated_at: m.updated_at.into(),
    })
}

impl SeaOrmSessionRepository {
    async fn load(
        &self,
        session_id: &str,
    ) -> Result<models::scoping_session::Model, ScopingError> {
        models::scoping_session::find_by_session_id(&self.db, session_id)
            .await
            .map_err(ScopingError::from)?
            .ok_or(ScopingError::NotFound)
    }

    /// Conditional transition: `UPDATE ... WHERE session_id = ? AND status =
    /// expected`, checking rows affected. Zero rows means the id is unknown
    /// or a concurrent writer moved the status first; the re-read tells the
    /// two apart.
    async fn transition(
        &self,
        session_id: &str,
        expected: SessionStatus,
        to: SessionStatus,
        extra: Vec<(models::scoping_session::Column, SimpleExpr)>,
    ) -> Result<SessionRecord, ScopingError> {
        use models::scoping_session::Column;

        let mut update = models::scoping_session::Entity::update_many()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.eq(expected.as_str()))
            .col_expr(Column::Status, Expr::value(to.as_str()))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()));
        for (col, expr) in extra {
            update = update.col_expr(col, expr);
        }
        let res = update
            .exec(&self.db)
            .await
            .map_err(|e| ScopingError::Repository(e.to_string()))?;
        if res.rows_affected == 0 {
            let current = self.load(session_id).await?;
            let from = SessionStatus::parse(&current.status).ok_or_else(|| {
                ScopingError::Repository(format!("unknown status '{}'", current.status))
            })?;
            return Err(ScopingError::StateConflict { from, to });
        }
        to_record(self.load(session_id).await?)
    }
}

#[async_trait::async_trait]
impl SessionRepository for SeaOrmSessionRepository {
    async fn find(&self, session_id: &str) -> Result<Option<SessionRecord>, ScopingError> {
        let res = models::scoping_session::find_by_session_id(&self.db, session_id).await?;
        res.map(to_record).transpose()
    }

    async fn create_if_missing(&self, session_id: &str) -> Result<SessionRecord, ScopingError> {
        let m = models::scoping_session::create_if_missing(&self.db, session_id).await?;
        to_record(m)
    }

    async fn touch(&self, session_id: &str) -> Result<SessionRecord, ScopingError> {
        let m = self.load(session_id).await?;
        to_record(models::scoping_session::touch(&self.db, m).await?)
    }

    async fn update_brief(
        &self,
        session_id: &str,
        brief_data: &str,
    ) -> Result<SessionRecord, ScopingError> {
        let m = self.load(session_id).await?;
        to_record(models::scoping_session::update_brief(&self.db, m, brief_data).await?)
    }

    async fn mark_submitted(
        &self,
        session_id: &str,
        email: &str,
        user_id: &str,
        expected: SessionStatus,
    ) -> Result<SessionRecord, ScopingError> {
        use models::scoping_session::Column;
        self.transition(
            session_id,
            expected,
            SessionStatus::Submitted,
            vec![
                (Column::Email, Expr::value(Some(email.to_string()))),
                (Column::UserId, Expr::value(Some(user_id.to_string()))),
            ],
        )
        .await
    }

    async fn mark_approved(
        &self,
        session_id: &str,
        ticket_id: Option<Uuid>,
        expected: SessionStatus,
    ) -> Result<SessionRecord, ScopingError> {
        use models::scoping_session::Column;
        let mut extra = Vec::new();
        if ticket_id.is_some() {
            extra.push((Column::TicketId, Expr::value(ticket_id)));
        }
        self.transition(session_id, expected, SessionStatus::Approved, extra).await
    }

    async fn mark_rejected(
        &self,
        session_id: &str,
        reason: Option<&str>,
        expected: SessionStatus,
    ) -> Result<SessionRecord, ScopingError> {
        use models::scoping_session::Column;
        self.transition(
            session_id,
            expected,
            SessionStatus::Rejected,
            vec![(Column::RejectionReason, Expr::value(reason.map(str::to_string)))],
        )
        .await
    }

    async fn set_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        expected: SessionStatus,
    ) -> Result<SessionRecord, ScopingError> {
        self.transition(session_id, expected, status, Vec::new()).await
    }

    async fn deliver(
        &self,
        session_id: &str,
        repo_url: &str,
        deploy_url: &str,
        site: NewSite,
        expected: SessionStatus,
    ) -> Result<SessionRecord, ScopingError> {
        use models::scoping_session::Column;

        // Both writes commit together; a site row without the session
        // pointing at it would be an orphaned, undiscoverable tenant.
        let txn =
            self.db.begin().await.map_err(|e| ScopingError::Repository(e.to_string()))?;

        // The session patch goes first and is conditional on the status the
        // caller observed; a concurrent deliver blocks on the row lock and
        // then matches zero rows, so only one site ever gets minted.
        let hit = models::scoping_session::Entity::update_many()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.eq(expected.as_str()))
            .col_expr(Column::Status, Expr::value(SessionStatus::Live.as_str()))
            .col_expr(Column::RepoUrl, Expr::value(Some(repo_url.to_string())))
            .col_expr(Column::DeployUrl, Expr::value(Some(deploy_url.to_string())))
            .col_expr(Column::SiteId, Expr::value(Some(site.site_id.clone())))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .exec(&txn)
            .await
            .map_err(|e| ScopingError::Repository(e.to_string()))?;
        if hit.rows_affected == 0 {
            let current = self.load(session_id).await?;
            let from = SessionStatus::parse(&current.status).ok_or_else(|| {
                ScopingError::Repository(format!("unknown status '{}'", current.status))
            })?;
            return Err(ScopingError::StateConflict { from, to: SessionStatus::Live });
        }

        let site_am = models::site::new_active_model(&models::site::NewSite {
            site_id: site.site_id.clone(),
            name: site.name,
            domain: site.domain,
            repo: site.repo,
            token_hash: site.token_hash,
            client_name: site.client_name,
            client_email: site.client_email,
        })?;
        site_am.insert(&txn).await.map_err(|e| ScopingError::Repository(e.to_string()))?;

        let updated = models::scoping_session::Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .one(&txn)
            .await
            .map_err(|e| ScopingError::Repository(e.to_string()))?
            .ok_or(ScopingError::NotFound)?;

        txn.commit().await.map_err(|e| ScopingError::Repository(e.to_string()))?;
        to_record(updated)
    }

    async fn list_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<SessionRecord>, ScopingError> {
        let all = models::scoping_session::list_by_status(&self.db, status.as_str()).await?;
        all.into_iter().map(to_record).collect()
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<SessionRecord>, ScopingError> {
        let all = models::scoping_session::list_by_user(&self.db, user_id).await?;
        all.into_iter().map(to_record).collect()
    }
}

pub struct SeaOrmGrantRepository {
    pub db: DatabaseConnection,
}

fn to_user(m: models::scope_user::Model) -> ScopeUser {
    ScopeUser {
        id: m.id,
        email: m.email,
        login_token: m.login_token,
        token_expires_at: m.token_expires_at.map(Into::into),
    }
}

#[async_trait::async_trait]
impl GrantRepository for SeaOrmGrantRepository {
    async fn ensure_user(&self, email: &str) -> Result<ScopeUser, ScopingError> {
        Ok(to_user(models::scope_user::ensure(&self.db, email).await?))
    }

    async fn store_grant(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<ScopeUser, ScopingError> {
        let m =
            models::scope_user::set_login_token(&self.db, email, token, expires_at.into()).await?;
        Ok(to_user(m))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<ScopeUser>, ScopingError> {
        let res = models::scope_user::find_by_login_token(&self.db, token).await?;
        Ok(res.map(to_user))
    }

    async fn consume_grant(&self, token: &str) -> Result<bool, ScopingError> {
        Ok(models::scope_user::consume_login_token(&self.db, token).await?)
    }
}
