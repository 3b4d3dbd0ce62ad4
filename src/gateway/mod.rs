//! Client for the WhatsApp automation gateway (WAHA-style HTTP API).

pub mod ids;
pub mod types;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::GatewayConfig;
use types::{ChatSummary, GatewaySession, Message, QrCode};

/// Response bodies are cut to this many chars before being logged.
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug)]
pub enum GatewayError {
    Transport(String),
    Status { status: u16, body: String },
    Decode(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Transport(msg) => write!(f, "request failed: {msg}"),
            GatewayError::Status { status, body } => write!(f, "status {status}: {body}"),
            GatewayError::Decode(msg) => write!(f, "invalid response: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| format!("Failed to build gateway client: {e}"))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.client.request(method, format!("{}{path}", self.base_url));
        match &self.api_key {
            Some(key) => req.header("X-Api-Key", key),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, GatewayError> {
        let resp = self.send_raw(req).await?;
        resp.json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn send_raw(&self, req: RequestBuilder) -> Result<reqwest::Response, GatewayError> {
        let resp = req
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(ERROR_BODY_LIMIT)
            .collect::<String>();

        Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        })
    }

    pub async fn list_sessions(&self) -> Result<Vec<GatewaySession>, GatewayError> {
        self.send(self.request(Method::GET, "/api/sessions?all=true"))
            .await
    }

    pub async fn get_session(&self, name: &str) -> Result<GatewaySession, GatewayError> {
        self.send(self.request(Method::GET, &format!("/api/sessions/{name}")))
            .await
    }

    pub async fn start_session(&self, name: &str) -> Result<GatewaySession, GatewayError> {
        self.send(
            self.request(Method::POST, "/api/sessions/start")
                .json(&json!({ "name": name })),
        )
        .await
    }

    pub async fn stop_session(&self, name: &str) -> Result<(), GatewayError> {
        self.send_raw(
            self.request(Method::POST, "/api/sessions/stop")
                .json(&json!({ "name": name, "logout": false })),
        )
        .await?;
        Ok(())
    }

    pub async fn qr_code(&self, name: &str) -> Result<QrCode, GatewayError> {
        self.send(self.request(Method::GET, &format!("/api/{name}/auth/qr?format=raw")))
            .await
    }

    pub async fn list_chats(
        &self,
        session: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ChatSummary>, GatewayError> {
        self.send(self.request(
            Method::GET,
            &format!("/api/{session}/chats/overview?limit={limit}&offset={offset}"),
        ))
        .await
    }

    pub async fn list_messages(
        &self,
        session: &str,
        chat_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, GatewayError> {
        self.send(self.request(
            Method::GET,
            &format!(
                "/api/{session}/chats/{chat_id}/messages?limit={limit}&offset={offset}&downloadMedia=false"
            ),
        ))
        .await
    }

    pub async fn send_text(
        &self,
        session: &str,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<Message, GatewayError> {
        let mut body = json!({ "session": session, "chatId": chat_id, "text": text });
        if let Some(reply_to) = reply_to {
            body["reply_to"] = json!(reply_to);
        }
        self.send(self.request(Method::POST, "/api/sendText").json(&body))
            .await
    }

    pub async fn mark_seen(&self, session: &str, chat_id: &str) -> Result<(), GatewayError> {
        self.send_raw(
            self.request(Method::POST, "/api/sendSeen")
                .json(&json!({ "session": session, "chatId": chat_id })),
        )
        .await?;
        Ok(())
    }
}
