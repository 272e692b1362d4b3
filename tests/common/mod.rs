#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use reqwest::StatusCode as HttpStatus;
use serde_json::Value;
use tower::ServiceExt;

use school_erp::app::{app, AppState};
use school_erp::auth::{generate_token, Claims, Role, TokenScope};
use school_erp::config::AppConfig;
use school_erp::database::TrustStatus;
use school_erp::testing::MemoryTrustStore;

// ---------------------------------------------------------------------------
// In-process router
// ---------------------------------------------------------------------------

/// Development config without a database server: every pool request fails
/// immediately with a configuration error.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.database.url = None;
    config.database.connection_timeout = 1;
    config.api.enable_request_logging = false;
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryTrustStore>,
}

/// Router over an in-memory registry holding `demo` (active), `maroon`
/// (suspended) and `oakridge` (active)
pub fn test_app() -> TestApp {
    let store = Arc::new(MemoryTrustStore::with_trusts(&[
        ("demo", TrustStatus::Active),
        ("maroon", TrustStatus::Suspended),
        ("oakridge", TrustStatus::Active),
    ]));
    let state = AppState::with_store(test_config(), store.clone());

    TestApp {
        router: app(state.clone()),
        state,
        store,
    }
}

pub fn token(scope: TokenScope, role: Role) -> String {
    let security = &test_config().security;
    let claims = Claims::new("tester@school.test", scope, role, security).expect("claims");
    generate_token(&claims, security).expect("token")
}

pub fn system_admin_token() -> String {
    token(TokenScope::System, Role::SystemAdmin)
}

pub fn trust_token(code: &str, role: Role) -> String {
    token(TokenScope::Trust(code.to_string()), role)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Send one request through the router and decode the JSON body
pub async fn send(
    router: &Router,
    method: Method,
    host: Option<&str>,
    path: &str,
    bearer: Option<&str>,
    json_body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(host) = host {
        builder = builder.header(header::HOST, host);
    }
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let body = match json_body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("router is infallible");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    TestResponse { status, body }
}

pub async fn get(router: &Router, host: &str, path: &str, bearer: Option<&str>) -> TestResponse {
    send(router, Method::GET, Some(host), path, bearer, None).await
}

// ---------------------------------------------------------------------------
// Spawned server binary
// ---------------------------------------------------------------------------

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_school-erp"));
        cmd.env("ERP_HOST", "127.0.0.1")
            .env("ERP_PORT", port.to_string())
            .env("APP_ENV", "development")
            // No database server in the test environment; /health reports degraded
            .env_remove("DATABASE_URL")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == HttpStatus::OK || resp.status() == HttpStatus::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
