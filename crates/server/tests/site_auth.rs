use std::net::SocketAddr;

use migration::MigratorTrait;
use reqwest::StatusCode;
use serde_json::json;
use tokio::net::TcpListener;
use uuid::Uuid;

use server::routes;
use server::state::ServerState;

const AGENT_SECRET: &str = "test-agent-secret";

struct TestApp {
    base_url: String,
}

async fn start_server() -> anyhow::Result<TestApp> {
    std::env::set_var("CONFIG_PATH", "/nonexistent-config-for-tests.toml");
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL missing; skipping server tests");
        return Err(anyhow::anyhow!("missing DATABASE_URL"));
    }

    let db = models::db::connect().await?;
    if let Err(e) = migration::Migrator::up(&db, None).await {
        eprintln!("migrations notice: {}", e);
    }

    let mut cfg = configs::AppConfig::default();
    cfg.auth.agent_secret = AGENT_SECRET.into();
    let state = ServerState::build(db, &cfg);

    let app = routes::build_router(state);
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });
    Ok(TestApp { base_url })
}

fn unique_site_id() -> String {
    format!("site-{}", Uuid::new_v4().simple())
}

async fn create_site(
    c: &reqwest::Client,
    base: &str,
    site_id: &str,
    raw_token: &str,
) -> anyhow::Result<()> {
    let res = c
        .post(format!("{base}/api/admin/sites"))
        .header("Authorization", format!("Bearer {AGENT_SECRET}"))
        .json(&json!({
            "site_id": site_id,
            "name": "Test Site",
            "domain": "test.example.com",
            "token": raw_token,
            "client_name": "Test Client",
        }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "create site failed: {}", res.status());
    Ok(())
}

#[tokio::test]
async fn health_is_public() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let res = reqwest::get(format!("{}/health", app.base_url)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn admin_provisioning_and_token_verify() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let c = reqwest::Client::new();
    let site_id = unique_site_id();
    let raw_token = format!("tok-{}", Uuid::new_v4().simple());

    // Wrong agent secret cannot provision.
    let res = c
        .post(format!("{}/api/admin/sites", app.base_url))
        .header("Authorization", "Bearer wrong")
        .json(&json!({
            "site_id": site_id, "name": "n", "domain": "d.com",
            "token": raw_token, "client_name": "c",
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    create_site(&c, &app.base_url, &site_id, &raw_token).await?;

    // The raw token authenticates.
    let res = c
        .post(format!("{}/api/auth/verify", app.base_url))
        .json(&json!({ "token": raw_token }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["site_id"], site_id.as_str());

    // An unknown token does not, and the body carries no detail.
    let res = c
        .post(format!("{}/api/auth/verify", app.base_url))
        .json(&json!({ "token": "definitely-wrong" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["authenticated"], false);
    Ok(())
}

#[tokio::test]
async fn messages_are_scoped_by_token() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let c = reqwest::Client::new();
    let site_id = unique_site_id();
    let raw_token = format!("tok-{}", Uuid::new_v4().simple());
    create_site(&c, &app.base_url, &site_id, &raw_token).await?;

    // No token: rejected.
    let res = c
        .post(format!("{}/api/messages", app.base_url))
        .json(&json!({ "content": "hello" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Header token: accepted and pending for the agent.
    let res = c
        .post(format!("{}/api/messages", app.base_url))
        .header("X-Relay-Token", &raw_token)
        .json(&json!({ "content": "hello from the widget" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Query-param fallback lists the same history.
    let res = c
        .get(format!("{}/api/messages?token={}", app.base_url, raw_token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    let items = body.as_array().expect("array body");
    assert!(items.iter().any(|m| m["content"] == "hello from the widget"));

    // Agent sees it in the pending queue for this site.
    let res = c
        .get(format!("{}/api/agent/pending?site_id={}", app.base_url, site_id))
        .header("Authorization", format!("Bearer {AGENT_SECRET}"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let pending = res.json::<serde_json::Value>().await?;
    assert_eq!(pending.as_array().map(|a| a.len()), Some(1));
    Ok(())
}

#[tokio::test]
async fn deactivation_revokes_site_access() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let c = reqwest::Client::new();
    let site_id = unique_site_id();
    let raw_token = format!("tok-{}", Uuid::new_v4().simple());
    create_site(&c, &app.base_url, &site_id, &raw_token).await?;

    let res = c
        .patch(format!("{}/api/admin/sites", app.base_url))
        .header("Authorization", format!("Bearer {AGENT_SECRET}"))
        .json(&json!({ "site_id": site_id, "active": false }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = c
        .post(format!("{}/api/auth/verify", app.base_url))
        .json(&json!({ "token": raw_token }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
