//! Forward-only session lifecycle engine.
//!
//! All transitions funnel through one guard: terminal sessions (`rejected`,
//! `live`) accept nothing, ever, and a transition never re-applies to a
//! session already in its target status. In strict mode the full edge set of
//! the state machine is enforced on top; in lenient mode operators may skip
//! intermediate states, matching how the intake desk actually works.
//!
//! Notifications go out only after the owning write has committed, and a
//! failed notification never surfaces to the caller.

use std::sync::Arc;

use tracing::{info, instrument};

use super::domain::{parse_brief, SessionRecord, SessionStatus};
use super::errors::ScopingError;
use super::magic_link::GrantRepository;
use super::repository::SessionRepository;
use crate::auth::domain::NewSite;
use crate::auth::repository::SiteRepository;
use crate::notify::{self, Notification, Notifier};
use crate::tickets::{TicketDraft, TicketStore};
use crate::token;

const MAX_SESSION_ID_LEN: usize = 128;
const MAX_BRIEF_LEN: usize = 64 * 1024;
const SLUG_PREFIX: &str = "scope-";
const SLUG_ALLOC_ATTEMPTS: usize = 5;

/// Result of the deliver transition. `token` is the raw site secret, exposed
/// exactly once; only its digest is stored.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Delivered {
    pub session: SessionRecord,
    pub site_id: String,
    pub token: String,
}

pub struct LifecycleEngine {
    sessions: Arc<dyn SessionRepository>,
    sites: Arc<dyn SiteRepository>,
    users: Arc<dyn GrantRepository>,
    tickets: Arc<dyn TicketStore>,
    notifier: Arc<dyn Notifier>,
    strict: bool,
}

impl LifecycleEngine {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        sites: Arc<dyn SiteRepository>,
        users: Arc<dyn GrantRepository>,
        tickets: Arc<dyn TicketStore>,
        notifier: Arc<dyn Notifier>,
        strict: bool,
    ) -> Self {
        Self { sessions, sites, users, tickets, notifier, strict }
    }

    // Same-state re-application is refused in both modes: transitions carry
    // side effects (tickets, notifications) that must fire at most once.
    fn guard(&self, from: SessionStatus, to: SessionStatus) -> Result<(), ScopingError> {
        if from.is_terminal() || from == to || (self.strict && !from.allows(to)) {
            return Err(ScopingError::StateConflict { from, to });
        }
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<SessionRecord, ScopingError> {
        self.sessions.find(session_id).await?.ok_or(ScopingError::NotFound)
    }

    pub async fn session(&self, session_id: &str) -> Result<SessionRecord, ScopingError> {
        self.load(session_id).await
    }

    /// Operator review queue.
    pub async fn sessions_with_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<SessionRecord>, ScopingError> {
        self.sessions.list_by_status(status).await
    }

    /// Idempotent session bootstrap from the intake widget.
    #[instrument(skip(self))]
    pub async fn ensure_session(&self, session_id: &str) -> Result<SessionRecord, ScopingError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ScopingError::Validation("session_id required".into()));
        }
        if session_id.len() > MAX_SESSION_ID_LEN {
            return Err(ScopingError::Validation("session_id too long".into()));
        }
        self.sessions.create_if_missing(session_id).await
    }

    /// A chat turn happened; only freshness is tracked here, the transcript
    /// itself lives client-side inside the brief. Creates the session lazily.
    pub async fn record_activity(&self, session_id: &str) -> Result<SessionRecord, ScopingError> {
        self.ensure_session(session_id).await?;
        self.sessions.touch(session_id).await
    }

    /// Replace the brief payload, creating the session lazily.
    #[instrument(skip(self, brief_data))]
    pub async fn update_brief(
        &self,
        session_id: &str,
        brief_data: &str,
    ) -> Result<SessionRecord, ScopingError> {
        if brief_data.len() > MAX_BRIEF_LEN {
            return Err(ScopingError::Validation("brief too large".into()));
        }
        let current = self.ensure_session(session_id).await?;
        if current.status.is_terminal() {
            return Err(ScopingError::StateConflict {
                from: current.status,
                to: current.status,
            });
        }
        self.sessions.update_brief(session_id, brief_data).await
    }

    /// Client submits the brief for operator review, binding the session to
    /// a verified email identity.
    #[instrument(skip(self))]
    pub async fn submit(
        &self,
        session_id: &str,
        email: &str,
    ) -> Result<SessionRecord, ScopingError> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(ScopingError::Validation("invalid email".into()));
        }
        let current = self.load(session_id).await?;
        self.guard(current.status, SessionStatus::Submitted)?;

        let user = self.users.ensure_user(&email).await?;
        let updated = self
            .sessions
            .mark_submitted(session_id, &email, &user.id.to_string(), current.status)
            .await?;

        notify::dispatch(
            &self.notifier,
            Notification::Ops(format!("Scoping brief submitted: {session_id} ({email})")),
        );
        Ok(updated)
    }

    /// Operator accepts the brief. A build ticket is cut from the brief
    /// contents; an unparseable brief still yields a ticket with placeholder
    /// text rather than blocking the approval.
    #[instrument(skip(self))]
    pub async fn approve(&self, session_id: &str) -> Result<SessionRecord, ScopingError> {
        let current = self.load(session_id).await?;
        self.guard(current.status, SessionStatus::Approved)?;

        let brief = parse_brief(current.brief_data.as_deref());
        let ticket = self
            .tickets
            .create(TicketDraft {
                site_id: session_id.to_string(),
                title: brief.project_name.clone(),
                description: brief.summary,
                kind: "scoping".into(),
                priority: None,
                page_url: None,
                screenshot: None,
                metadata: None,
                client_token: String::new(),
            })
            .await
            .map_err(|e| ScopingError::Repository(e.to_string()))?;

        let updated =
            self.sessions.mark_approved(session_id, Some(ticket.id), current.status).await?;
        info!(%session_id, ticket_id = %ticket.id, "session approved");

        notify::dispatch(
            &self.notifier,
            Notification::Ops(format!(
                "Scoping approved: {session_id} ({})",
                brief.project_name
            )),
        );
        if let Some(to) = updated.email.clone() {
            notify::dispatch(
                &self.notifier,
                Notification::Email {
                    to,
                    subject: "Your project brief was approved".into(),
                    body: format!("{} is moving into build.", brief.project_name),
                },
            );
        }
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn reject(
        &self,
        session_id: &str,
        reason: Option<&str>,
    ) -> Result<SessionRecord, ScopingError> {
        let current = self.load(session_id).await?;
        self.guard(current.status, SessionStatus::Rejected)?;

        let updated = self.sessions.mark_rejected(session_id, reason, current.status).await?;

        if let Some(to) = updated.email.clone() {
            notify::dispatch(
                &self.notifier,
                Notification::Email {
                    to,
                    subject: "Your project brief was not accepted".into(),
                    body: reason.unwrap_or("No reason was given.").to_string(),
                },
            );
        }
        Ok(updated)
    }

    /// Operator-driven progress updates. `live` is reserved for
    /// [`deliver`](LifecycleEngine::deliver), the others for their dedicated
    /// transitions.
    #[instrument(skip(self))]
    pub async fn advance(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<SessionRecord, ScopingError> {
        if !matches!(status, SessionStatus::Building | SessionStatus::Review) {
            return Err(ScopingError::Validation(format!(
                "status '{}' has a dedicated transition",
                status.as_str()
            )));
        }
        let current = self.load(session_id).await?;
        self.guard(current.status, status)?;
        self.sessions.set_status(session_id, status, current.status).await
    }

    /// Terminal provisioning transition: mint a tenant for the finished
    /// build and flip the session to `live` in one transactional write.
    /// Returns the raw site token; it is never stored and never shown again.
    #[instrument(skip(self))]
    pub async fn deliver(
        &self,
        session_id: &str,
        repo_url: &str,
        deploy_url: &str,
    ) -> Result<Delivered, ScopingError> {
        let current = self.load(session_id).await?;
        self.guard(current.status, SessionStatus::Live)?;

        url::Url::parse(repo_url)
            .map_err(|_| ScopingError::Validation("invalid repo_url".into()))?;
        let deploy = url::Url::parse(deploy_url)
            .map_err(|_| ScopingError::Validation("invalid deploy_url".into()))?;
        let domain = deploy
            .host_str()
            .ok_or_else(|| ScopingError::Validation("deploy_url has no host".into()))?
            .to_string();

        let site_id = self.allocate_site_id(session_id).await?;
        let raw_token = token::generate();
        let brief = parse_brief(current.brief_data.as_deref());

        let site = NewSite {
            site_id: site_id.clone(),
            name: brief.project_name.clone(),
            domain,
            repo: Some(repo_url.to_string()),
            token_hash: token::digest(&raw_token),
            client_name: current.email.clone().unwrap_or_else(|| brief.project_name.clone()),
            client_email: current.email.clone(),
        };
        let session = self
            .sessions
            .deliver(session_id, repo_url, deploy_url, site, current.status)
            .await?;
        info!(%session_id, %site_id, "session delivered");

        notify::dispatch(
            &self.notifier,
            Notification::Ops(format!(
                "Delivered {session_id} as site {site_id} ({deploy_url})"
            )),
        );
        if let Some(to) = session.email.clone() {
            notify::dispatch(
                &self.notifier,
                Notification::Email {
                    to,
                    subject: "Your site is live".into(),
                    body: format!("{} is live at {deploy_url}.", brief.project_name),
                },
            );
        }
        Ok(Delivered { session, site_id, token: raw_token })
    }

    /// Derive a site id slug from the session id, retrying with a random
    /// suffix on collision.
    async fn allocate_site_id(&self, session_id: &str) -> Result<String, ScopingError> {
        let base: String = session_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect::<String>()
            .to_lowercase();
        let base = if base.is_empty() {
            format!("{SLUG_PREFIX}{}", token::generate()[..8].to_lowercase())
        } else {
            format!("{SLUG_PREFIX}{base}")
        };

        let mut candidate = base.clone();
        for _ in 0..SLUG_ALLOC_ATTEMPTS {
            let taken = self
                .sites
                .find_by_site_id(&candidate)
                .await
                .map_err(|e| ScopingError::Repository(e.to_string()))?
                .is_some();
            if !taken {
                return Ok(candidate);
            }
            candidate = format!("{base}-{}", token::generate()[..4].to_lowercase());
        }
        Err(ScopingError::Repository("could not allocate a unique site id".into()))
    }

    pub async fn dashboard_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<SessionRecord>, ScopingError> {
        self.sessions.list_by_user(user_id).await
    }

    /// Sessions visible to an email identity. Active sessions are excluded:
    /// they carry no email until submission.
    pub async fn dashboard_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<SessionRecord>, ScopingError> {
        let email = email.trim().to_lowercase();
        let mut out = Vec::new();
        for status in SessionStatus::dashboard_scan() {
            let batch = self.sessions.list_by_status(status).await?;
            out.extend(batch.into_iter().filter(|s| s.email.as_deref() == Some(&email)));
        }
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockSiteRepository;
    use crate::notify::capture::CapturingNotifier;
    use crate::scoping::domain::FALLBACK_PROJECT_NAME;
    use crate::scoping::magic_link::mock::MockGrantRepository;
    use crate::scoping::repository::mock::MockSessionRepository;
    use crate::tickets::mock::MockTicketStore;
    use uuid::Uuid;

    struct Harness {
        sites: Arc<MockSiteRepository>,
        sessions: Arc<MockSessionRepository>,
        tickets: Arc<MockTicketStore>,
        notifier: Arc<CapturingNotifier>,
        engine: LifecycleEngine,
    }

    fn harness(strict: bool) -> Harness {
        harness_with_notifier(strict, Arc::new(CapturingNotifier::default()))
    }

    fn harness_with_notifier(strict: bool, notifier: Arc<CapturingNotifier>) -> Harness {
        let sites = Arc::new(MockSiteRepository::default());
        let sessions = Arc::new(MockSessionRepository::new(sites.clone()));
        let users = Arc::new(MockGrantRepository::default());
        let tickets = Arc::new(MockTicketStore::default());
        let engine = LifecycleEngine::new(
            sessions.clone(),
            sites.clone(),
            users,
            tickets.clone(),
            notifier.clone() as Arc<dyn Notifier>,
            strict,
        );
        Harness { sites, sessions, tickets, notifier, engine }
    }

    // Spawned notification tasks run on yield under the current-thread
    // test runtime.
    async fn drain_notifications() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn ensure_session_is_idempotent() {
        let h = harness(false);
        let a = h.engine.ensure_session("sess-1").await.unwrap();
        h.engine.update_brief("sess-1", "{}").await.unwrap();
        let b = h.engine.ensure_session("sess-1").await.unwrap();
        assert_eq!(a.session_id, b.session_id);
        assert_eq!(b.brief_data.as_deref(), Some("{}"));
        assert_eq!(b.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn ensure_session_rejects_blank_and_oversized_ids() {
        let h = harness(false);
        assert!(matches!(
            h.engine.ensure_session("   ").await,
            Err(ScopingError::Validation(_))
        ));
        let long = "s".repeat(MAX_SESSION_ID_LEN + 1);
        assert!(matches!(
            h.engine.ensure_session(&long).await,
            Err(ScopingError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn full_intake_path_provisions_a_working_tenant() {
        let h = harness(false);
        h.engine.ensure_session("sess-42").await.unwrap();
        h.engine
            .update_brief(
                "sess-42",
                r#"{"project_name":"Acme Shop","summary":"storefront build"}"#,
            )
            .await
            .unwrap();

        let submitted = h.engine.submit("sess-42", "Client@Example.com").await.unwrap();
        assert_eq!(submitted.status, SessionStatus::Submitted);
        assert_eq!(submitted.email.as_deref(), Some("client@example.com"));
        assert!(submitted.user_id.is_some());

        let approved = h.engine.approve("sess-42").await.unwrap();
        assert_eq!(approved.status, SessionStatus::Approved);
        let tickets = h.tickets.all();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].title, "Acme Shop");
        assert_eq!(approved.ticket_id, Some(tickets[0].id));

        h.engine.advance("sess-42", SessionStatus::Building).await.unwrap();

        let delivered = h
            .engine
            .deliver("sess-42", "https://git.example.com/acme", "https://acme.example.com")
            .await
            .unwrap();
        assert_eq!(delivered.session.status, SessionStatus::Live);
        assert_eq!(delivered.session.site_id.as_deref(), Some(delivered.site_id.as_str()));
        assert!(delivered.site_id.starts_with(SLUG_PREFIX));

        // The minted tenant is discoverable by id and authenticates by the
        // digest of the returned raw token.
        let site = h.sites.find_by_site_id(&delivered.site_id).await.unwrap().unwrap();
        assert_eq!(site.name, "Acme Shop");
        assert_eq!(site.domain, "acme.example.com");
        let by_hash =
            h.sites.find_by_token_hash(&token::digest(&delivered.token)).await.unwrap();
        assert!(by_hash.is_some());
    }

    #[tokio::test]
    async fn terminal_sessions_accept_nothing_even_in_lenient_mode() {
        let h = harness(false);
        h.engine.ensure_session("sess-r").await.unwrap();
        h.engine.submit("sess-r", "a@b.com").await.unwrap();
        h.engine.reject("sess-r", Some("out of scope")).await.unwrap();

        assert!(matches!(
            h.engine.approve("sess-r").await,
            Err(ScopingError::StateConflict { .. })
        ));
        assert!(matches!(
            h.engine.update_brief("sess-r", "{}").await,
            Err(ScopingError::StateConflict { .. })
        ));
        assert!(matches!(
            h.engine.deliver("sess-r", "https://a.com", "https://b.com").await,
            Err(ScopingError::StateConflict { .. })
        ));
    }

    #[tokio::test]
    async fn live_sessions_are_terminal() {
        let h = harness(false);
        h.engine.ensure_session("sess-l").await.unwrap();
        h.engine.deliver("sess-l", "https://a.com/r", "https://b.com").await.unwrap();
        assert!(matches!(
            h.engine.reject("sess-l", None).await,
            Err(ScopingError::StateConflict { .. })
        ));
    }

    #[tokio::test]
    async fn strict_mode_enforces_ordering() {
        let h = harness(true);
        h.engine.ensure_session("sess-s").await.unwrap();

        // Approval straight from active is an out-of-order edge.
        assert!(matches!(
            h.engine.approve("sess-s").await,
            Err(ScopingError::StateConflict { .. })
        ));
        // Delivery requires an approved or in-progress session.
        assert!(matches!(
            h.engine.deliver("sess-s", "https://a.com", "https://b.com").await,
            Err(ScopingError::StateConflict { .. })
        ));

        h.engine.submit("sess-s", "a@b.com").await.unwrap();
        h.engine.approve("sess-s").await.unwrap();
        h.engine.advance("sess-s", SessionStatus::Building).await.unwrap();
        h.engine.advance("sess-s", SessionStatus::Review).await.unwrap();
        h.engine.deliver("sess-s", "https://a.com/r", "https://b.com").await.unwrap();
    }

    #[tokio::test]
    async fn lenient_mode_allows_skipping_review_steps() {
        let h = harness(false);
        h.engine.ensure_session("sess-skip").await.unwrap();
        // Straight from active to approved to live.
        h.engine.approve("sess-skip").await.unwrap();
        h.engine.deliver("sess-skip", "https://a.com/r", "https://b.com").await.unwrap();
    }

    #[tokio::test]
    async fn repeated_approval_does_not_cut_a_second_ticket() {
        let h = harness(false);
        h.engine.ensure_session("sess-dup").await.unwrap();
        h.engine.submit("sess-dup", "a@b.com").await.unwrap();
        let first = h.engine.approve("sess-dup").await.unwrap();

        // Re-applying the same transition conflicts even in lenient mode.
        assert!(matches!(
            h.engine.approve("sess-dup").await,
            Err(ScopingError::StateConflict { .. })
        ));
        assert_eq!(h.tickets.all().len(), 1);
        let current = h.engine.session("sess-dup").await.unwrap();
        assert_eq!(current.ticket_id, first.ticket_id);
    }

    #[tokio::test]
    async fn stale_status_writes_lose_the_race() {
        let h = harness(false);
        h.engine.ensure_session("sess-race").await.unwrap();
        h.engine.submit("sess-race", "a@b.com").await.unwrap();

        // Two operators read `submitted`; the first write lands, the second
        // carries the stale status and is refused by the store itself.
        let winner = Uuid::new_v4();
        h.sessions
            .mark_approved("sess-race", Some(winner), SessionStatus::Submitted)
            .await
            .unwrap();
        assert!(matches!(
            h.sessions
                .mark_approved("sess-race", Some(Uuid::new_v4()), SessionStatus::Submitted)
                .await,
            Err(ScopingError::StateConflict { .. })
        ));
        let current = h.engine.session("sess-race").await.unwrap();
        assert_eq!(current.ticket_id, Some(winner));
    }

    #[tokio::test]
    async fn advance_only_covers_progress_statuses() {
        let h = harness(false);
        h.engine.ensure_session("sess-a").await.unwrap();
        assert!(matches!(
            h.engine.advance("sess-a", SessionStatus::Live).await,
            Err(ScopingError::Validation(_))
        ));
        assert!(matches!(
            h.engine.advance("sess-a", SessionStatus::Rejected).await,
            Err(ScopingError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn deliver_rejects_malformed_urls() {
        let h = harness(false);
        h.engine.ensure_session("sess-u").await.unwrap();
        assert!(matches!(
            h.engine.deliver("sess-u", "not a url", "https://b.com").await,
            Err(ScopingError::Validation(_))
        ));
        assert!(matches!(
            h.engine.deliver("sess-u", "https://a.com", "nope").await,
            Err(ScopingError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn approve_with_garbage_brief_cuts_placeholder_ticket() {
        let h = harness(false);
        h.engine.ensure_session("sess-g").await.unwrap();
        h.engine.update_brief("sess-g", "definitely not json").await.unwrap();
        h.engine.approve("sess-g").await.unwrap();

        let tickets = h.tickets.all();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].title, FALLBACK_PROJECT_NAME);
        assert_eq!(tickets[0].description, "definitely not json");
    }

    #[tokio::test]
    async fn site_id_collisions_get_a_suffix() {
        let h = harness(false);
        h.engine.ensure_session("sessionAlpha").await.unwrap();
        h.engine.ensure_session("sessionAzure").await.unwrap();
        // Both ids share the same first eight alphanumeric characters.
        let first = h
            .engine
            .deliver("sessionAlpha", "https://a.com/1", "https://one.com")
            .await
            .unwrap();
        let second = h
            .engine
            .deliver("sessionAzure", "https://a.com/2", "https://two.com")
            .await
            .unwrap();
        assert_ne!(first.site_id, second.site_id);
        assert!(second.site_id.starts_with(&first.site_id));
    }

    #[tokio::test]
    async fn notifications_follow_the_transitions() {
        let h = harness(false);
        h.engine.ensure_session("sess-n").await.unwrap();
        h.engine.submit("sess-n", "a@b.com").await.unwrap();
        h.engine.reject("sess-n", Some("budget")).await.unwrap();
        drain_notifications().await;

        assert!(h.notifier.ops_texts().iter().any(|t| t.contains("sess-n")));
        assert_eq!(h.notifier.emails_to(), vec!["a@b.com".to_string()]);
    }

    #[tokio::test]
    async fn failing_notifier_never_blocks_a_transition() {
        let h = harness_with_notifier(false, Arc::new(CapturingNotifier::failing()));
        h.engine.ensure_session("sess-f").await.unwrap();
        let submitted = h.engine.submit("sess-f", "a@b.com").await.unwrap();
        assert_eq!(submitted.status, SessionStatus::Submitted);
        drain_notifications().await;
        assert_eq!(h.notifier.ops_texts().len(), 1);
    }

    #[tokio::test]
    async fn dashboard_by_email_sees_only_own_submitted_sessions() {
        let h = harness(false);
        h.engine.ensure_session("mine").await.unwrap();
        h.engine.ensure_session("theirs").await.unwrap();
        h.engine.ensure_session("draft").await.unwrap();
        h.engine.submit("mine", "me@x.com").await.unwrap();
        h.engine.submit("theirs", "other@x.com").await.unwrap();

        let visible = h.engine.dashboard_by_email("ME@x.com").await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].session_id, "mine");
    }

    #[tokio::test]
    async fn dashboard_by_user_lists_sessions_bound_at_submit() {
        let h = harness(false);
        h.engine.ensure_session("s1").await.unwrap();
        let submitted = h.engine.submit("s1", "a@b.com").await.unwrap();
        let user_id = submitted.user_id.unwrap();

        let visible = h.engine.dashboard_by_user(&user_id).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].session_id, "s1");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found_for_operator_transitions() {
        let h = harness(false);
        assert!(matches!(h.engine.approve("nope").await, Err(ScopingError::NotFound)));
        assert!(matches!(h.engine.reject("nope", None).await, Err(ScopingError::NotFound)));
        assert!(matches!(
            h.engine.deliver("nope", "https://a.com", "https://b.com").await,
            Err(ScopingError::NotFound)
        ));
    }

    #[tokio::test]
    async fn brief_and_activity_create_the_session_lazily() {
        let h = harness(false);
        let s = h.engine.update_brief("fresh", r#"{"summary":"x"}"#).await.unwrap();
        assert_eq!(s.status, SessionStatus::Active);
        let s = h.engine.record_activity("fresh-2").await.unwrap();
        assert_eq!(s.session_id, "fresh-2");
    }
}
