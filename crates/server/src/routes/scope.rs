//! Scoping intake surface. Session endpoints are keyed by the
//! client-generated session id and take no site token; operator transitions
//! sit behind the agent secret.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use service::scoping::domain::{SessionRecord, SessionStatus};
use service::scoping::lifecycle::Delivered;
use service::scoping::magic_link::VerifiedEmail;

use crate::errors::ApiError;
use crate::routes::require_agent;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct SessionInput {
    pub session_id: String,
}

pub async fn ensure_session(
    State(state): State<ServerState>,
    Json(input): Json<SessionInput>,
) -> Result<Json<SessionRecord>, ApiError> {
    Ok(Json(state.engine.ensure_session(&input.session_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

pub async fn get_session(
    State(state): State<ServerState>,
    Query(q): Query<SessionQuery>,
) -> Result<Json<SessionRecord>, ApiError> {
    Ok(Json(state.engine.session(&q.session_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct MessageInput {
    pub session_id: String,
    pub content: String,
}

/// The transcript itself stays client-side; the server only tracks that the
/// conversation moved.
pub async fn record_message(
    State(state): State<ServerState>,
    Json(input): Json<MessageInput>,
) -> Result<Json<SessionRecord>, ApiError> {
    if input.content.trim().is_empty() {
        return Err(ApiError::Validation("content required".into()));
    }
    Ok(Json(state.engine.record_activity(&input.session_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct BriefInput {
    pub session_id: String,
    pub brief_data: String,
}

pub async fn update_brief(
    State(state): State<ServerState>,
    Json(input): Json<BriefInput>,
) -> Result<Json<SessionRecord>, ApiError> {
    Ok(Json(state.engine.update_brief(&input.session_id, &input.brief_data).await?))
}

#[derive(Debug, Deserialize)]
pub struct SubmitInput {
    pub session_id: String,
    pub email: String,
}

pub async fn submit(
    State(state): State<ServerState>,
    Json(input): Json<SubmitInput>,
) -> Result<Json<SessionRecord>, ApiError> {
    Ok(Json(state.engine.submit(&input.session_id, &input.email).await?))
}

pub async fn approve(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(input): Json<SessionInput>,
) -> Result<Json<SessionRecord>, ApiError> {
    require_agent(&state, &headers)?;
    Ok(Json(state.engine.approve(&input.session_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RejectInput {
    pub session_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn reject(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(input): Json<RejectInput>,
) -> Result<Json<SessionRecord>, ApiError> {
    require_agent(&state, &headers)?;
    Ok(Json(state.engine.reject(&input.session_id, input.reason.as_deref()).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub session_id: String,
    pub status: String,
}

/// Progress updates (`building`, `review`); the other statuses each have a
/// dedicated endpoint.
pub async fn set_status(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(input): Json<StatusInput>,
) -> Result<Json<SessionRecord>, ApiError> {
    require_agent(&state, &headers)?;
    let status = SessionStatus::parse(&input.status)
        .ok_or_else(|| ApiError::Validation(format!("unknown status '{}'", input.status)))?;
    Ok(Json(state.engine.advance(&input.session_id, status).await?))
}

#[derive(Debug, Deserialize)]
pub struct DeliverInput {
    pub session_id: String,
    pub repo_url: String,
    pub deploy_url: String,
}

/// The returned token is shown exactly once; only its digest survives.
pub async fn deliver(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(input): Json<DeliverInput>,
) -> Result<Json<Delivered>, ApiError> {
    require_agent(&state, &headers)?;
    let delivered = state
        .engine
        .deliver(&input.session_id, &input.repo_url, &input.deploy_url)
        .await?;
    Ok(Json(delivered))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

pub async fn sessions_by_status(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(q): Query<StatusQuery>,
) -> Result<Json<Vec<SessionRecord>>, ApiError> {
    require_agent(&state, &headers)?;
    let status = SessionStatus::parse(&q.status)
        .ok_or_else(|| ApiError::Validation(format!("unknown status '{}'", q.status)))?;
    Ok(Json(state.engine.sessions_with_status(status).await?))
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

pub async fn dashboard(
    State(state): State<ServerState>,
    Query(q): Query<DashboardQuery>,
) -> Result<Json<Vec<SessionRecord>>, ApiError> {
    let sessions = match (q.user_id.as_deref(), q.email.as_deref()) {
        (Some(user_id), _) => state.engine.dashboard_by_user(user_id).await?,
        (None, Some(email)) => state.engine.dashboard_by_email(email).await?,
        (None, None) => {
            return Err(ApiError::Validation("user_id or email required".into()))
        }
    };
    Ok(Json(sessions))
}

#[derive(Debug, Deserialize)]
pub struct RequestTokenInput {
    pub email: String,
}

pub async fn request_token(
    State(state): State<ServerState>,
    Json(input): Json<RequestTokenInput>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let grant = state.magic_link.issue(&input.email).await?;
    Ok(Json(json!({ "token": grant.token, "expires_at": grant.expires_at })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyTokenInput {
    pub token: String,
}

pub async fn verify_token(
    State(state): State<ServerState>,
    Json(input): Json<VerifyTokenInput>,
) -> Result<Json<VerifiedEmail>, ApiError> {
    Ok(Json(state.magic_link.redeem(&input.token).await?))
}
