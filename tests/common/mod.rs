#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode as AxumStatus};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use chatdesk::config::{Config, GatewayConfig};

pub const GATEWAY_API_KEY: &str = "test-gateway-key";
pub const ADMIN_EMAIL: &str = "admin@test.com";
pub const PASSWORD: &str = "password123";

/// In-memory stand-in for the WhatsApp gateway.
#[derive(Default)]
pub struct MockGateway {
    pub sessions: Vec<Value>,
    pub chats: Vec<Value>,
    pub messages: Vec<Value>,
    pub sent: Vec<Value>,
    pub seen: Vec<Value>,
    pub stopped: Vec<String>,
}

pub type SharedGateway = Arc<Mutex<MockGateway>>;

#[derive(Deserialize)]
struct Paging {
    limit: Option<usize>,
    offset: Option<usize>,
}

fn page(items: &[Value], paging: &Paging) -> Vec<Value> {
    let offset = paging.offset.unwrap_or(0);
    let limit = paging.limit.unwrap_or(items.len());
    items.iter().skip(offset).take(limit).cloned().collect()
}

fn authorized(headers: &HeaderMap) -> Result<(), Response> {
    match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        Some(GATEWAY_API_KEY) => Ok(()),
        _ => Err((AxumStatus::UNAUTHORIZED, Json(json!({ "error": "bad key" }))).into_response()),
    }
}

async fn mock_list_sessions(
    State(gw): State<SharedGateway>,
    headers: HeaderMap,
) -> Result<Json<Value>, Response> {
    authorized(&headers)?;
    Ok(Json(json!(gw.lock().unwrap().sessions)))
}

async fn mock_get_session(
    State(gw): State<SharedGateway>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<Value>, Response> {
    authorized(&headers)?;
    gw.lock()
        .unwrap()
        .sessions
        .iter()
        .find(|s| s["name"] == json!(name))
        .cloned()
        .map(Json)
        .ok_or_else(|| (AxumStatus::NOT_FOUND, "session not found").into_response())
}

async fn mock_start_session(
    State(gw): State<SharedGateway>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(AxumStatus, Json<Value>), Response> {
    authorized(&headers)?;
    let session = json!({ "name": body["name"], "status": "STARTING" });
    gw.lock().unwrap().sessions.push(session.clone());
    Ok((AxumStatus::CREATED, Json(session)))
}

async fn mock_stop_session(
    State(gw): State<SharedGateway>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<AxumStatus, Response> {
    authorized(&headers)?;
    let name = body["name"].as_str().unwrap_or_default().to_string();
    gw.lock().unwrap().stopped.push(name);
    Ok(AxumStatus::CREATED)
}

async fn mock_qr(
    headers: HeaderMap,
    Path(session): Path<String>,
) -> Result<Json<Value>, Response> {
    authorized(&headers)?;
    Ok(Json(json!({ "value": format!("qr-for-{session}") })))
}

async fn mock_chats(
    State(gw): State<SharedGateway>,
    headers: HeaderMap,
    Query(paging): Query<Paging>,
) -> Result<Json<Value>, Response> {
    authorized(&headers)?;
    Ok(Json(json!(page(&gw.lock().unwrap().chats, &paging))))
}

async fn mock_messages(
    State(gw): State<SharedGateway>,
    headers: HeaderMap,
    Path((_session, chat_id)): Path<(String, String)>,
    Query(paging): Query<Paging>,
) -> Result<Json<Value>, Response> {
    authorized(&headers)?;
    let gw = gw.lock().unwrap();
    let for_chat: Vec<Value> = gw
        .messages
        .iter()
        .filter(|m| m["from"] == json!(chat_id) || m["to"] == json!(chat_id))
        .cloned()
        .collect();
    Ok(Json(json!(page(&for_chat, &paging))))
}

async fn mock_send_text(
    State(gw): State<SharedGateway>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(AxumStatus, Json<Value>), Response> {
    authorized(&headers)?;
    let mut gw = gw.lock().unwrap();
    let message = json!({
        "id": format!("true_{}_{}", body["chatId"].as_str().unwrap_or_default(), gw.sent.len()),
        "timestamp": 1_700_000_000,
        "from": "4900000000000@c.us",
        "to": body["chatId"],
        "fromMe": true,
        "body": body["text"],
        "hasMedia": false,
        "ackName": "SERVER"
    });
    gw.sent.push(body);
    Ok((AxumStatus::CREATED, Json(message)))
}

async fn mock_send_seen(
    State(gw): State<SharedGateway>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, Response> {
    authorized(&headers)?;
    gw.lock().unwrap().seen.push(body);
    Ok(Json(json!({})))
}

async fn spawn_gateway() -> (SocketAddr, SharedGateway) {
    let gateway: SharedGateway = Arc::new(Mutex::new(MockGateway::default()));

    let app = Router::new()
        .route("/api/sessions", get(mock_list_sessions))
        .route("/api/sessions/start", post(mock_start_session))
        .route("/api/sessions/stop", post(mock_stop_session))
        .route("/api/sessions/{name}", get(mock_get_session))
        .route("/api/sendText", post(mock_send_text))
        .route("/api/sendSeen", post(mock_send_seen))
        .route("/api/{session}/auth/qr", get(mock_qr))
        .route("/api/{session}/chats/overview", get(mock_chats))
        .route("/api/{session}/chats/{chat_id}/messages", get(mock_messages))
        .with_state(gateway.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock gateway");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock gateway failed");
    });

    (addr, gateway)
}

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    pub gateway: SharedGateway,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn read(resp: reqwest::Response) -> (Value, StatusCode) {
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "email": email, "password": password, "name": name }))
            .send()
            .await
            .expect("register request failed");
        Self::read(resp).await
    }

    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed");
        Self::read(resp).await
    }

    /// Register the bootstrap admin, return its access token.
    pub async fn bootstrap(&self) -> String {
        let (body, status) = self.register(ADMIN_EMAIL, PASSWORD, "Admin").await;
        assert_eq!(status, StatusCode::CREATED, "bootstrap register failed: {body}");
        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    /// Create a developer as admin, return the developer JSON.
    pub async fn create_developer(&self, admin_token: &str, name: &str, email: &str) -> Value {
        let (body, status) = self
            .post_auth(
                "/api/v1/developers",
                admin_token,
                &json!({ "name": name, "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create developer failed: {body}");
        body["data"].clone()
    }

    /// Create a developer and log in as them. Returns (developer JSON, token).
    pub async fn developer_session(&self, admin_token: &str, name: &str, email: &str) -> (Value, String) {
        let developer = self.create_developer(admin_token, name, email).await;
        let (body, status) = self.login(email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "developer login failed: {body}");
        let token = body["data"]["access_token"].as_str().unwrap().to_string();
        (developer, token)
    }

    /// Assign a chat to one developer, return the created assignment.
    pub async fn assign(&self, admin_token: &str, developer_id: &str, session: &str, chat_id: &str) -> Value {
        let (body, status) = self
            .post_auth(
                "/api/v1/assignments",
                admin_token,
                &json!({
                    "developer_id": developer_id,
                    "session_id": session,
                    "chat_id": chat_id,
                    "chat_name": "Customer",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "assign failed: {body}");
        body["data"]["assignments"][0].clone()
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        Self::read(resp).await
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        Self::read(resp).await
    }

    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        Self::read(resp).await
    }

    /// Deliver a gateway event to the webhook endpoint.
    pub async fn post_webhook(&self, event: &Value, secret: Option<&str>) -> (Value, StatusCode) {
        let mut req = self
            .client
            .post(self.url("/api/v1/webhooks/gateway"))
            .json(event);
        if let Some(secret) = secret {
            req = req.header("x-webhook-secret", secret);
        }
        let resp = req.send().await.expect("webhook request failed");
        Self::read(resp).await
    }
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Spawn a test app with a fresh temporary database and mock gateway.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Like `spawn_app`, letting the test adjust the config first.
pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let db_name = format!("chatdesk_test_{}", Uuid::now_v7().simple());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let (gateway_addr, gateway) = spawn_gateway().await;

    let mut config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        gateway: GatewayConfig {
            base_url: format!("http://{gateway_addr}"),
            api_key: Some(GATEWAY_API_KEY.to_string()),
            timeout: Duration::from_secs(5),
        },
        webhook_secret: None,
        cors_origins: vec![],
        max_body_size: 1_048_576,
        log_level: "warn".to_string(),
    };
    configure(&mut config);

    let app = chatdesk::build_app(pool.clone(), config).expect("Failed to build app");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
        gateway,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
