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

#[tokio::test]
async fn intake_to_live_site() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let c = reqwest::Client::new();
    let session_id = format!("sess-{}", Uuid::new_v4().simple());
    let email = format!("client_{}@example.com", Uuid::new_v4().simple());

    // Idempotent bootstrap.
    for _ in 0..2 {
        let res = c
            .post(format!("{}/api/scope/session", app.base_url))
            .json(&json!({ "session_id": session_id }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::OK);
        let body = res.json::<serde_json::Value>().await?;
        assert_eq!(body["status"], "active");
    }

    let res = c
        .post(format!("{}/api/scope/brief", app.base_url))
        .json(&json!({
            "session_id": session_id,
            "brief_data": r#"{"project_name":"Acme Shop","summary":"storefront build"}"#,
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = c
        .post(format!("{}/api/scope/submit", app.base_url))
        .json(&json!({ "session_id": session_id, "email": email }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["status"], "submitted");

    // Operator endpoints demand the agent secret.
    let res = c
        .post(format!("{}/api/scope/approve", app.base_url))
        .json(&json!({ "session_id": session_id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = c
        .post(format!("{}/api/scope/approve", app.base_url))
        .header("Authorization", format!("Bearer {AGENT_SECRET}"))
        .json(&json!({ "session_id": session_id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["status"], "approved");
    assert!(body["ticket_id"].is_string());

    let res = c
        .post(format!("{}/api/scope/deliver", app.base_url))
        .header("Authorization", format!("Bearer {AGENT_SECRET}"))
        .json(&json!({
            "session_id": session_id,
            "repo_url": "https://git.example.com/acme",
            "deploy_url": "https://acme.example.com",
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let delivered = res.json::<serde_json::Value>().await?;
    assert_eq!(delivered["session"]["status"], "live");
    let raw_token = delivered["token"].as_str().expect("raw token").to_string();
    let site_id = delivered["site_id"].as_str().expect("site id").to_string();
    assert_eq!(delivered["session"]["site_id"], site_id.as_str());

    // The minted token authenticates the new tenant.
    let res = c
        .post(format!("{}/api/auth/verify", app.base_url))
        .json(&json!({ "token": raw_token }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["site_id"], site_id.as_str());
    assert_eq!(body["name"], "Acme Shop");

    // Terminal: no further transitions.
    let res = c
        .post(format!("{}/api/scope/reject", app.base_url))
        .header("Authorization", format!("Bearer {AGENT_SECRET}"))
        .json(&json!({ "session_id": session_id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // The dashboard shows the journey under the submitting email.
    let res = c
        .get(format!("{}/api/scope/dashboard?email={}", app.base_url, email))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let sessions = res.json::<serde_json::Value>().await?;
    let items = sessions.as_array().expect("array body");
    assert!(items.iter().any(|s| s["session_id"] == session_id.as_str()));
    Ok(())
}

#[tokio::test]
async fn magic_link_grant_is_single_use() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let c = reqwest::Client::new();
    let email = format!("login_{}@example.com", Uuid::new_v4().simple());

    let res = c
        .post(format!("{}/api/scope/request-token", app.base_url))
        .json(&json!({ "email": email }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    let token = body["token"].as_str().expect("grant token").to_string();

    let res = c
        .post(format!("{}/api/scope/verify-token", app.base_url))
        .json(&json!({ "token": token }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["email"], email.as_str());

    // Replay fails: the grant was consumed.
    let res = c
        .post(format!("{}/api/scope/verify-token", app.base_url))
        .json(&json!({ "token": token }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn rejection_is_terminal() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let c = reqwest::Client::new();
    let session_id = format!("sess-{}", Uuid::new_v4().simple());

    c.post(format!("{}/api/scope/session", app.base_url))
        .json(&json!({ "session_id": session_id }))
        .send()
        .await?;
    let res = c
        .post(format!("{}/api/scope/reject", app.base_url))
        .header("Authorization", format!("Bearer {AGENT_SECRET}"))
        .json(&json!({ "session_id": session_id, "reason": "out of scope" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = c
        .post(format!("{}/api/scope/approve", app.base_url))
        .header("Authorization", format!("Bearer {AGENT_SECRET}"))
        .json(&json!({ "session_id": session_id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    Ok(())
}
