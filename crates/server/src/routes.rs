use axum::http::header::{HeaderMap, HeaderName, AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};
use tracing::Level;

use common::types::Health;
use service::auth::domain::AuthedSite;

use crate::errors::ApiError;
use crate::state::ServerState;

pub mod admin;
pub mod agent;
pub mod auth;
pub mod messages;
pub mod scope;
pub mod tickets;

pub const SITE_TOKEN_HEADER: &str = "x-relay-token";

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Site bearer token from the custom header, with a query-param fallback for
/// embed contexts that cannot set headers.
pub(crate) fn site_token(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    headers
        .get(SITE_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| query_token.map(str::to_string))
}

pub(crate) async fn require_site(
    state: &ServerState,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<AuthedSite, ApiError> {
    let token = site_token(headers, query_token).unwrap_or_default();
    Ok(state.site_auth.verify(&token).await?)
}

pub(crate) fn require_agent(state: &ServerState, headers: &HeaderMap) -> Result<(), ApiError> {
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    state.agent.verify_header(authorization)?;
    Ok(())
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(SITE_TOKEN_HEADER),
        ])
}

/// Build the full application router: site-facing, agent, admin and scoping
/// surfaces plus health.
pub fn build_router(state: ServerState) -> Router {
    let site_api = Router::new()
        .route("/api/auth/verify", post(auth::verify))
        .route("/api/messages", get(messages::list).post(messages::create))
        .route(
            "/api/tickets",
            get(tickets::list).post(tickets::create).patch(tickets::update),
        );

    let agent_api = Router::new()
        .route("/api/agent/tickets", get(agent::tickets))
        .route("/api/agent/tickets/all", get(agent::tickets_all))
        .route("/api/agent/reply", post(agent::reply))
        .route("/api/agent/pending", get(agent::pending));

    let admin_api = Router::new().route(
        "/api/admin/sites",
        get(admin::list_sites).post(admin::create_site).patch(admin::update_site),
    );

    let scope_api = Router::new()
        .route("/api/scope/session", get(scope::get_session).post(scope::ensure_session))
        .route("/api/scope/message", post(scope::record_message))
        .route("/api/scope/brief", post(scope::update_brief))
        .route("/api/scope/submit", post(scope::submit))
        .route("/api/scope/approve", post(scope::approve))
        .route("/api/scope/reject", post(scope::reject))
        .route("/api/scope/status", post(scope::set_status))
        .route("/api/scope/deliver", post(scope::deliver))
        .route("/api/scope/sessions", get(scope::sessions_by_status))
        .route("/api/scope/dashboard", get(scope::dashboard))
        .route("/api/scope/request-token", post(scope::request_token))
        .route("/api/scope/verify-token", post(scope::verify_token));

    Router::new()
        .route("/health", get(health))
        .merge(site_api)
        .merge(agent_api)
        .merge(admin_api)
        .merge(scope_api)
        .with_state(state)
        .layer(build_cors())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new().level(Level::INFO).include_headers(false),
                )
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
