use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use service::notify::{self, Notification};
use service::tickets::{TicketDraft, TicketPatch, TicketRecord};

use crate::errors::ApiError;
use crate::routes::{require_agent, require_site};
use crate::state::ServerState;

const LIST_LIMIT: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateInput {
    pub title: String,
    pub description: String,
    pub kind: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn create(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(input): Json<CreateInput>,
) -> Result<Json<TicketRecord>, ApiError> {
    let site = require_site(&state, &headers, input.token.as_deref()).await?;
    let record = state
        .tickets
        .create(TicketDraft {
            site_id: site.site_id.clone(),
            title: input.title,
            description: input.description,
            kind: input.kind,
            priority: input.priority,
            page_url: input.page_url,
            screenshot: input.screenshot,
            metadata: input.metadata,
            client_token: site.token_hash.clone(),
        })
        .await?;

    notify::dispatch(
        &state.notifier,
        Notification::Ops(format!(
            "[{}] new {} ticket: {}",
            site.name, record.kind, record.title
        )),
    );
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Site view: always scoped to the authenticated site.
pub async fn list(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<TicketRecord>>, ApiError> {
    let site = require_site(&state, &headers, q.token.as_deref()).await?;
    let out = state
        .tickets
        .list(Some(&site.site_id), q.status.as_deref(), LIST_LIMIT)
        .await?;
    Ok(Json(out))
}

#[derive(Debug, Deserialize)]
pub struct UpdateInput {
    pub id: Uuid,
    #[serde(flatten)]
    pub patch: TicketPatch,
}

/// Triage is the agent's; sites cannot touch ticket state.
pub async fn update(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(input): Json<UpdateInput>,
) -> Result<Json<TicketRecord>, ApiError> {
    require_agent(&state, &headers)?;
    let record = state.tickets.update(input.id, input.patch).await?;
    Ok(Json(record))
}
