use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub gateway: GatewayConfig,
    pub webhook_secret: Option<String>,
    pub cors_origins: Vec<String>,
    pub max_body_size: usize,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("CHATDESK_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid CHATDESK_HOST: {e}"))?;

        let port: u16 = env_or("CHATDESK_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid CHATDESK_PORT: {e}"))?;

        let gateway_url = env_required("CHATDESK_GATEWAY_URL")?;
        if !gateway_url.starts_with("http://") && !gateway_url.starts_with("https://") {
            return Err(format!(
                "Invalid CHATDESK_GATEWAY_URL: expected an http(s) URL, got '{gateway_url}'"
            ));
        }

        let timeout_secs: u64 = env_or("CHATDESK_GATEWAY_TIMEOUT_SECS", "30")
            .parse()
            .map_err(|e| format!("Invalid CHATDESK_GATEWAY_TIMEOUT_SECS: {e}"))?;

        let gateway = GatewayConfig {
            base_url: gateway_url.trim_end_matches('/').to_string(),
            api_key: env_optional("CHATDESK_GATEWAY_API_KEY"),
            timeout: Duration::from_secs(timeout_secs),
        };

        let webhook_secret = env_optional("CHATDESK_WEBHOOK_SECRET");

        let cors_origins = env_or("CHATDESK_CORS_ORIGINS", "")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_body_size: usize = env_or("CHATDESK_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid CHATDESK_MAX_BODY_SIZE: {e}"))?;

        let log_level = env_or("CHATDESK_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            gateway,
            webhook_secret,
            cors_origins,
            max_body_size,
            log_level,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
