use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use service::messages::MessageRecord;
use service::notify::{self, Notification};

use crate::errors::ApiError;
use crate::routes::require_site;
use crate::state::ServerState;

const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn list(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<MessageRecord>>, ApiError> {
    let site = require_site(&state, &headers, q.token.as_deref()).await?;
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let out = state.messages.list(&site.site_id, limit).await?;
    Ok(Json(out))
}

#[derive(Debug, Deserialize)]
pub struct CreateInput {
    pub content: String,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn create(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(input): Json<CreateInput>,
) -> Result<Json<MessageRecord>, ApiError> {
    let site = require_site(&state, &headers, input.token.as_deref()).await?;
    let record = state
        .messages
        .post(&site.site_id, "user", &input.content, "pending", input.metadata)
        .await?;

    let preview: String = record.content.chars().take(200).collect();
    notify::dispatch(
        &state.notifier,
        Notification::Ops(format!("[{}] new message: {preview}", site.name)),
    );
    Ok(Json(record))
}
