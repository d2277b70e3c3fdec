//! Site provisioning and management, behind the shared agent secret.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use service::auth::domain::{NewSite, SiteRecord, SiteUpdate};
use service::token;

use crate::errors::ApiError;
use crate::routes::require_agent;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct CreateSiteInput {
    pub site_id: String,
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub repo: Option<String>,
    /// Raw bearer secret chosen by the operator; only its digest is stored.
    pub token: String,
    pub client_name: String,
    #[serde(default)]
    pub client_email: Option<String>,
}

pub async fn create_site(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(input): Json<CreateSiteInput>,
) -> Result<Json<SiteRecord>, ApiError> {
    require_agent(&state, &headers)?;
    if input.token.trim().is_empty() {
        return Err(ApiError::Validation("token required".into()));
    }
    let record = state
        .sites
        .create(NewSite {
            site_id: input.site_id,
            name: input.name,
            domain: input.domain,
            repo: input.repo,
            token_hash: token::digest(&input.token),
            client_name: input.client_name,
            client_email: input.client_email,
        })
        .await?;
    Ok(Json(record))
}

pub async fn list_sites(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SiteRecord>>, ApiError> {
    require_agent(&state, &headers)?;
    Ok(Json(state.sites.list().await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSiteInput {
    pub site_id: String,
    #[serde(flatten)]
    pub patch: SiteUpdate,
}

pub async fn update_site(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(input): Json<UpdateSiteInput>,
) -> Result<Json<SiteRecord>, ApiError> {
    require_agent(&state, &headers)?;
    let record = state.sites.update(&input.site_id, input.patch).await?;
    Ok(Json(record))
}
