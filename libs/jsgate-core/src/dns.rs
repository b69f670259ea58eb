//! Custom domain verification.
//!
//! A custom domain is verified when one of its A/AAAA records equals the
//! platform's public IP. Domains behind a known reverse proxy cannot be
//! checked that way and land in `cloudflare_pending` until an operator
//! force-activates them.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ActivationError;
use crate::model::{CustomDomain, DomainStatus};

pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// Published Cloudflare edge ranges.
pub const CLOUDFLARE_RANGES: &[&str] = &[
    "173.245.48.0/20",
    "103.21.244.0/22",
    "103.22.200.0/22",
    "103.31.4.0/22",
    "141.101.64.0/18",
    "108.162.192.0/18",
    "190.93.240.0/20",
    "188.114.96.0/20",
    "197.234.240.0/22",
    "198.41.128.0/17",
    "162.158.0.0/15",
    "104.16.0.0/13",
    "104.24.0.0/14",
    "172.64.0.0/13",
    "131.0.72.0/22",
    "2400:cb00::/32",
    "2606:4700::/32",
    "2803:f800::/32",
    "2405:b500::/32",
    "2405:8100::/32",
    "2a06:98c0::/29",
    "2c0f:f248::/32",
];

#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>>;
}

/// Resolves through the operating system's resolver with a hard timeout.
#[derive(Debug, Clone)]
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new(DEFAULT_DNS_TIMEOUT)
    }
}

#[async_trait]
impl DnsResolver for SystemResolver {
    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>> {
        let addrs = tokio::time::timeout(self.timeout, tokio::net::lookup_host((domain, 80)))
            .await
            .map_err(|_| anyhow!("DNS lookup for '{}' timed out after {:?}", domain, self.timeout))?
            .with_context(|| format!("DNS lookup for '{}' failed", domain))?;

        let mut ips: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            if !ips.contains(&addr.ip()) {
                ips.push(addr.ip());
            }
        }
        // A records first.
        ips.sort_by_key(|ip| ip.is_ipv6());
        Ok(ips)
    }
}

#[derive(Debug, Clone)]
pub struct ProxyRanges {
    networks: Vec<IpNetwork>,
}

impl ProxyRanges {
    pub fn from_cidrs<'a>(cidrs: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let networks = cidrs
            .into_iter()
            .map(|c| {
                c.parse::<IpNetwork>()
                    .with_context(|| format!("invalid CIDR '{}'", c))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { networks })
    }

    pub fn cloudflare() -> Self {
        Self {
            networks: CLOUDFLARE_RANGES
                .iter()
                .filter_map(|c| c.parse().ok())
                .collect(),
        }
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        self.networks.iter().any(|n| n.contains(ip))
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub domain: String,
    #[serde(rename = "match")]
    pub matched: bool,
    pub resolved_ip: Option<String>,
    pub resolved_ips: Vec<String>,
    pub platform_ip: String,
    pub is_cloudflare: bool,
    pub status: DomainStatus,
    pub message: String,
}

#[derive(Clone)]
pub struct DnsVerifier {
    resolver: Arc<dyn DnsResolver>,
    platform_ip: IpAddr,
    proxy_ranges: ProxyRanges,
}

impl DnsVerifier {
    pub fn new(
        resolver: Arc<dyn DnsResolver>,
        platform_ip: IpAddr,
        proxy_ranges: ProxyRanges,
    ) -> Self {
        Self {
            resolver,
            platform_ip,
            proxy_ranges,
        }
    }

    pub fn platform_ip(&self) -> IpAddr {
        self.platform_ip
    }

    pub async fn verify(&self, domain: &str) -> VerificationReport {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();
        let platform_ip = self.platform_ip.to_string();

        let resolved = match self.resolver.resolve(&domain).await {
            Ok(ips) => ips,
            Err(e) => {
                warn!("DNS verification of '{}' could not resolve: {:#}", domain, e);
                Vec::new()
            }
        };
        let resolved_ips: Vec<String> = resolved.iter().map(ToString::to_string).collect();

        let (status, resolved_ip, is_cloudflare, message) = if resolved.is_empty() {
            (
                DomainStatus::Failed,
                None,
                false,
                format!(
                    "Could not resolve {}. Create an A record pointing to {}.",
                    domain, platform_ip
                ),
            )
        } else if resolved.contains(&self.platform_ip) {
            (
                DomainStatus::Verified,
                Some(platform_ip.clone()),
                false,
                format!("Domain verified: {} points to {}.", domain, platform_ip),
            )
        } else if let Some(proxied) = resolved.iter().find(|ip| self.proxy_ranges.contains(**ip)) {
            (
                DomainStatus::CloudflarePending,
                Some(proxied.to_string()),
                true,
                format!(
                    "{} resolves to {}, a Cloudflare proxy address. \
                     Make sure the origin points to {} and activate it manually.",
                    domain, proxied, platform_ip
                ),
            )
        } else {
            (
                DomainStatus::Failed,
                resolved_ips.first().cloned(),
                false,
                format!(
                    "DNS mismatch: {} resolves to {}, expected {}.",
                    domain,
                    resolved_ips.join(", "),
                    platform_ip
                ),
            )
        };

        info!("DNS verification of '{}': {}", domain, status);
        VerificationReport {
            domain,
            matched: status == DomainStatus::Verified,
            resolved_ip,
            resolved_ips,
            platform_ip,
            is_cloudflare,
            status,
            message,
        }
    }
}

impl CustomDomain {
    /// Records the outcome of a verification attempt. Transitions are not
    /// monotonic; a verified domain whose record moved becomes `failed`.
    /// `is_active` is left to the operator.
    pub fn apply_verification(&mut self, report: &VerificationReport, now: DateTime<Utc>) {
        self.status = report.status;
        self.resolved_ip = report.resolved_ip.clone();
        self.platform_ip = report.platform_ip.clone();
        if report.status == DomainStatus::Verified {
            self.verified_at = Some(now);
        }
    }

    /// Activation requires `verified` unless `force` is set. Forcing never
    /// touches `status`.
    pub fn set_active(&mut self, active: bool, force: bool) -> Result<(), ActivationError> {
        if active && !force && self.status != DomainStatus::Verified {
            return Err(ActivationError::NotVerified(self.status));
        }
        self.is_active = active;
        Ok(())
    }
}
