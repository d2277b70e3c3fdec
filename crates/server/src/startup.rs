use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use tracing::info;

use crate::routes;
use crate::state::ServerState;

fn init_logging() {
    init_logging_default();
}

fn load_bind_addr(cfg: &configs::AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Public entry: load config, connect storage, build the app and serve.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let cfg = configs::AppConfig::load_and_validate()?;

    let db = models::db::connect_with(
        &cfg.database.url,
        cfg.database.max_connections,
        cfg.database.min_connections,
        Duration::from_secs(cfg.database.connect_timeout_secs),
        Duration::from_secs(cfg.database.acquire_timeout_secs),
        cfg.database.sqlx_logging,
    )
    .await?;

    let state = ServerState::build(db, &cfg);
    let app: Router = routes::build_router(state);

    let addr = load_bind_addr(&cfg)?;
    info!(%addr, strict_transitions = cfg.scoping.strict_transitions, "starting relay server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
