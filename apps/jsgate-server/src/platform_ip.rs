use std::net::IpAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;

use crate::config::ServerConfig;

/// Asks a plain-text IP echo service for this host's public address.
#[derive(Clone)]
pub struct PlatformIpClient {
    client: Client,
    echo_url: String,
}

impl PlatformIpClient {
    pub fn new(echo_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, echo_url })
    }

    pub async fn detect(&self) -> Result<IpAddr> {
        let body = self
            .client
            .get(&self.echo_url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.echo_url))?
            .error_for_status()?
            .text()
            .await?;

        parse_ip(&body).with_context(|| format!("{} returned an unexpected body", self.echo_url))
    }
}

fn parse_ip(raw: &str) -> Result<IpAddr> {
    let raw = raw.trim();
    raw.parse()
        .with_context(|| format!("'{}' is not an IP address", raw))
}

/// Configured `platform_ip`, or the detected public address.
pub async fn resolve_platform_ip(config: &ServerConfig) -> Result<IpAddr> {
    if let Some(ip) = config.platform_ip.as_deref() {
        return parse_ip(ip).context("Invalid PLATFORM_IP");
    }

    let ip = PlatformIpClient::new(config.platform_ip_echo_url.clone())?
        .detect()
        .await?;
    info!("Detected platform IP {}", ip);
    Ok(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_echo_bodies() {
        assert_eq!(parse_ip("203.0.113.10\n").unwrap().to_string(), "203.0.113.10");
        assert_eq!(parse_ip(" 2001:db8::1 ").unwrap().to_string(), "2001:db8::1");
        assert!(parse_ip("<html>").is_err());
    }

    #[tokio::test]
    async fn configured_ip_skips_detection() {
        let mut config = crate::handlers::test_support::test_config();
        config.platform_ip = Some("198.51.100.4".into());
        config.platform_ip_echo_url = "http://127.0.0.1:9/unreachable".into();
        assert_eq!(
            resolve_platform_ip(&config).await.unwrap().to_string(),
            "198.51.100.4"
        );
    }
}
