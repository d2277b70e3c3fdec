use std::sync::Arc;

use sea_orm::DatabaseConnection;

use service::auth::repo::seaorm::SeaOrmSiteRepository;
use service::auth::repository::SiteRepository;
use service::auth::{AgentAuth, SiteAuthService};
use service::messages::{MessageStore, SeaOrmMessageStore};
use service::notify::{NoopNotifier, Notifier, TelegramNotifier};
use service::scoping::repo::seaorm::{SeaOrmGrantRepository, SeaOrmSessionRepository};
use service::scoping::{LifecycleEngine, MagicLinkIssuer};
use service::tickets::{SeaOrmTicketStore, TicketStore};

/// Shared per-request state. Everything is behind an `Arc`; handlers clone
/// the state freely.
#[derive(Clone)]
pub struct ServerState {
    pub site_auth: Arc<SiteAuthService>,
    pub agent: AgentAuth,
    pub engine: Arc<LifecycleEngine>,
    pub magic_link: Arc<MagicLinkIssuer>,
    pub messages: Arc<dyn MessageStore>,
    pub tickets: Arc<dyn TicketStore>,
    pub sites: Arc<dyn SiteRepository>,
    pub notifier: Arc<dyn Notifier>,
}

impl ServerState {
    /// Wire the full SeaORM-backed stack from a live connection and config.
    pub fn build(db: DatabaseConnection, cfg: &configs::AppConfig) -> Self {
        let notifier: Arc<dyn Notifier> = if cfg.notify.telegram_bot_token.is_empty()
            || cfg.notify.telegram_chat_id.is_empty()
        {
            Arc::new(NoopNotifier)
        } else {
            Arc::new(TelegramNotifier::new(
                cfg.notify.telegram_bot_token.clone(),
                cfg.notify.telegram_chat_id.clone(),
            ))
        };

        let sites: Arc<dyn SiteRepository> =
            Arc::new(SeaOrmSiteRepository { db: db.clone() });
        let sessions = Arc::new(SeaOrmSessionRepository { db: db.clone() });
        let grants = Arc::new(SeaOrmGrantRepository { db: db.clone() });
        let tickets: Arc<dyn TicketStore> = Arc::new(SeaOrmTicketStore { db: db.clone() });
        let messages: Arc<dyn MessageStore> = Arc::new(SeaOrmMessageStore { db });

        let engine = Arc::new(LifecycleEngine::new(
            sessions,
            sites.clone(),
            grants.clone(),
            tickets.clone(),
            notifier.clone(),
            cfg.scoping.strict_transitions,
        ));

        Self {
            site_auth: Arc::new(SiteAuthService::new(sites.clone())),
            agent: AgentAuth::new(cfg.auth.agent_secret.clone()),
            engine,
            magic_link: Arc::new(MagicLinkIssuer::new(grants)),
            messages,
            tickets,
            sites,
            notifier,
        }
    }
}
