//! Best-effort outbound notifications.
//!
//! Dispatch is fire-and-forget: the owning transition commits first, then the
//! notification task is spawned and any failure is logged and swallowed. A
//! notification must never fail or roll back a workflow transition.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum Notification {
    /// Human-readable event for the operator chat-ops channel.
    Ops(String),
    /// Notice addressed to a scoping client. Transport is an external
    /// collaborator; this layer only hands the content over.
    Email { to: String, subject: String, body: String },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("notifier not configured")]
    Unconfigured,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Spawn the delivery and swallow the outcome. Callers must invoke this only
/// after their own storage write has committed.
pub fn dispatch(notifier: &Arc<dyn Notifier>, notification: Notification) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        if let Err(e) = notifier.deliver(notification).await {
            warn!(error = %e, "notification dropped");
        }
    });
}

/// Telegram bot channel for operator events. Email notices have no transport
/// here; they are logged at the handoff point.
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self { http: reqwest::Client::new(), bot_token, chat_id }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        match notification {
            Notification::Ops(text) => {
                if self.bot_token.is_empty() || self.chat_id.is_empty() {
                    return Err(NotifyError::Unconfigured);
                }
                let url =
                    format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
                self.http
                    .post(&url)
                    .json(&serde_json::json!({
                        "chat_id": self.chat_id,
                        "text": text,
                        "parse_mode": "HTML",
                    }))
                    .send()
                    .await
                    .map_err(|e| NotifyError::Transport(e.to_string()))?;
                Ok(())
            }
            Notification::Email { to, subject, .. } => {
                info!(%to, %subject, "email notice handed off");
                Ok(())
            }
        }
    }
}

/// Drops everything. Used when no channel is configured.
pub struct NoopNotifier;

#[async_trait::async_trait]
impl Notifier for NoopNotifier {
    async fn deliver(&self, _notification: Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Test double that records every notification it sees.
pub mod capture {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct CapturingNotifier {
        pub seen: Mutex<Vec<Notification>>,
        pub fail: bool,
    }

    impl CapturingNotifier {
        pub fn failing() -> Self {
            Self { seen: Mutex::new(Vec::new()), fail: true }
        }

        pub fn ops_texts(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .filter_map(|n| match n {
                    Notification::Ops(t) => Some(t.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn emails_to(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .filter_map(|n| match n {
                    Notification::Email { to, .. } => Some(to.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl Notifier for CapturingNotifier {
        async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push(notification);
            if self.fail {
                return Err(NotifyError::Transport("capture configured to fail".into()));
            }
            Ok(())
        }
    }
}
