use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::routes::site_token;
use crate::state::ServerState;

#[derive(Debug, Deserialize, Default)]
pub struct VerifyInput {
    #[serde(default)]
    pub token: Option<String>,
}

/// Widget handshake. The failure body deliberately carries no detail: a
/// missing, unknown and revoked token all look identical from outside.
pub async fn verify(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Option<Json<VerifyInput>>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let from_body = body.and_then(|Json(input)| input.token);
    let token = from_body
        .or_else(|| site_token(&headers, None))
        .unwrap_or_default();

    match state.site_auth.verify(&token).await {
        Ok(site) => Ok(Json(json!({
            "authenticated": true,
            "site_id": site.site_id,
            "name": site.name,
            "client_name": site.client_name,
            "system_prompt": site.system_prompt,
        }))),
        Err(_) => Err((StatusCode::UNAUTHORIZED, Json(json!({ "authenticated": false })))),
    }
}
