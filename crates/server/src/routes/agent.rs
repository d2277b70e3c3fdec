//! Operator endpoints, all behind the shared agent secret.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use service::messages::MessageRecord;
use service::tickets::TicketRecord;

use crate::errors::ApiError;
use crate::routes::require_agent;
use crate::state::ServerState;

const LIST_LIMIT: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct TicketQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub site_id: Option<String>,
}

pub async fn tickets(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(q): Query<TicketQuery>,
) -> Result<Json<Vec<TicketRecord>>, ApiError> {
    require_agent(&state, &headers)?;
    let out = state
        .tickets
        .list(q.site_id.as_deref(), q.status.as_deref(), LIST_LIMIT)
        .await?;
    Ok(Json(out))
}

pub async fn tickets_all(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Result<Json<Vec<TicketRecord>>, ApiError> {
    require_agent(&state, &headers)?;
    Ok(Json(state.tickets.list_all().await?))
}

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    #[serde(default)]
    pub site_id: Option<String>,
}

pub async fn pending(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(q): Query<PendingQuery>,
) -> Result<Json<Vec<MessageRecord>>, ApiError> {
    require_agent(&state, &headers)?;
    Ok(Json(state.messages.pending(q.site_id.as_deref()).await?))
}

/// One endpoint for both agent actions: answering into a site's thread
/// (`content`) and marking an existing message handled (`message_id` +
/// `status`). At least one of the two must be present.
#[derive(Debug, Deserialize)]
pub struct ReplyInput {
    pub site_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
}

pub async fn reply(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(input): Json<ReplyInput>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_agent(&state, &headers)?;

    let mut posted: Option<MessageRecord> = None;
    if let Some(content) = input.content.as_deref() {
        let record = state
            .messages
            .post(&input.site_id, "agent", content, "sent", input.metadata.clone())
            .await?;
        posted = Some(record);
    }
    if let (Some(id), Some(status)) = (input.message_id, input.status.as_deref()) {
        state.messages.set_status(id, status, input.metadata).await?;
    } else if posted.is_none() {
        return Err(ApiError::Validation(
            "content or message_id+status required".into(),
        ));
    }
    Ok(Json(json!({ "ok": true, "message": posted })))
}
