use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

pub const DEFAULT_LISTEN_PORT: u16 = 8080;
pub const DEFAULT_ECHO_URL: &str = "https://api.ipify.org";
pub const DEFAULT_DNS_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;

const CONFIG_PATHS: &[&str] = &["/etc/jsgate/server.toml", "./server.toml"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub database_url: String,
    /// Bearer token required on operator routes.
    pub admin_token: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Public IP custom domains must point at. Detected at startup when unset.
    #[serde(default)]
    pub platform_ip: Option<String>,
    #[serde(default = "default_echo_url")]
    pub platform_ip_echo_url: String,
    #[serde(default = "default_dns_timeout_secs")]
    pub dns_timeout_secs: u64,
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    /// Take the client IP from `CF-Connecting-IP` / `X-Forwarded-For`. Only
    /// set when every request arrives through a proxy that overwrites them.
    #[serde(default)]
    pub trusted_proxy: bool,
    #[serde(skip)]
    pub source: String,
}

fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

fn default_echo_url() -> String {
    DEFAULT_ECHO_URL.to_string()
}

fn default_dns_timeout_secs() -> u64 {
    DEFAULT_DNS_TIMEOUT_SECS
}

fn default_db_max_connections() -> u32 {
    DEFAULT_DB_MAX_CONNECTIONS
}

impl ServerConfig {
    /// First readable TOML file wins, otherwise the environment.
    pub fn load() -> Result<Self> {
        for path in CONFIG_PATHS {
            if let Ok(contents) = fs::read_to_string(path) {
                let mut config: Self = toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse {}", path))?;
                config.source = path.to_string();
                return Ok(config);
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url: non_empty("DATABASE_URL").context("DATABASE_URL must be set")?,
            admin_token: non_empty("ADMIN_TOKEN").context("ADMIN_TOKEN must be set")?,
            listen_port: non_empty("LISTEN_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_LISTEN_PORT),
            platform_ip: non_empty("PLATFORM_IP"),
            platform_ip_echo_url: non_empty("PLATFORM_IP_ECHO_URL")
                .unwrap_or_else(default_echo_url),
            dns_timeout_secs: non_empty("DNS_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DNS_TIMEOUT_SECS),
            log_file: non_empty("LOG_FILE"),
            db_max_connections: non_empty("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            trusted_proxy: non_empty("TRUSTED_PROXY")
                .is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes")),
            source: "environment".to_string(),
        })
    }
}
