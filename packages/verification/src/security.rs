//! Outbound request guard for URLs taken from citation text.
//!
//! Citation text is user input, so the URL check and the page fetchers only
//! contact a cited URL after [`UrlValidator`] has approved it. Two kinds of
//! refusal are kept apart:
//!
//! - a policy denial: wrong scheme, an internal hostname, or an address in
//!   a private, loopback or link-local range;
//! - a host that does not resolve at all, which for a citation simply means
//!   the link is dead.
//!
//! API keys are held as [`SecretString`] (from `secrecy`), which redacts
//! itself in `Debug` output.

use std::collections::HashSet;
use std::net::IpAddr;

use ipnet::IpNet;
use url::{Host, Url};

use crate::error::{SecurityError, SecurityResult};

pub use secrecy::{ExposeSecret, SecretString};

/// Hostnames, or hostname suffixes, that only make sense inside a network.
const INTERNAL_NAMES: &[&str] = &[
    "localhost",
    ".localhost",
    ".internal",
    ".local",
    "instance-data",
];

const PRIVATE_RANGES: &[&str] = &[
    "0.0.0.0/8",
    "10.0.0.0/8",
    "100.64.0.0/10",
    "127.0.0.0/8",
    "169.254.0.0/16",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "::/128",
    "::1/128",
    "fc00::/7",
    "fe80::/10",
];

/// A cited URL the guard approved, with the addresses its host resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VettedUrl {
    pub url: Url,
    /// Empty when the host was a literal address or a trusted name.
    pub addrs: Vec<IpAddr>,
}

/// SSRF guard for cited URLs.
#[derive(Debug, Clone)]
pub struct UrlValidator {
    private_ranges: Vec<IpNet>,
    /// Hosts exempt from every rule (local test servers, trusted mirrors)
    trusted_hosts: HashSet<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlValidator {
    pub fn new() -> Self {
        Self {
            private_ranges: PRIVATE_RANGES
                .iter()
                .filter_map(|range| range.parse().ok())
                .collect(),
            trusted_hosts: HashSet::new(),
        }
    }

    /// Exempt a host (as it appears in the URL) from the guard.
    pub fn trust_host(mut self, host: impl Into<String>) -> Self {
        self.trusted_hosts.insert(host.into());
        self
    }

    /// Offline check of scheme and host. Hostnames are not resolved.
    pub fn check(&self, url: &str) -> SecurityResult<Url> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SecurityError::DisallowedScheme(parsed.scheme().to_string()));
        }
        if self.is_trusted(&parsed) {
            return Ok(parsed);
        }

        match parsed.host() {
            None => return Err(SecurityError::NoHost),
            Some(Host::Domain(name)) => {
                let name = name.trim_end_matches('.').to_ascii_lowercase();
                if is_internal_name(&name) {
                    return Err(SecurityError::BlockedHost(name));
                }
            }
            Some(Host::Ipv4(ip)) => self.check_addr(IpAddr::V4(ip))?,
            Some(Host::Ipv6(ip)) => self.check_addr(IpAddr::V6(ip))?,
        }
        Ok(parsed)
    }

    /// [`check`](Self::check), then resolve the hostname and require every
    /// address to be public. A name that does not resolve is reported as
    /// [`SecurityError::Unresolvable`], not as a policy denial.
    pub async fn resolve(&self, url: &str) -> SecurityResult<VettedUrl> {
        let parsed = self.check(url)?;
        let host = match parsed.host() {
            Some(Host::Domain(name)) if !self.is_trusted(&parsed) => name.to_string(),
            _ => {
                return Ok(VettedUrl {
                    url: parsed,
                    addrs: Vec::new(),
                })
            }
        };

        let port = parsed.port_or_known_default().unwrap_or(80);
        let unresolvable = |reason: String| SecurityError::Unresolvable {
            host: host.clone(),
            reason,
        };
        let addrs: Vec<IpAddr> = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|e| unresolvable(e.to_string()))?
            .map(|addr| addr.ip())
            .collect();
        if addrs.is_empty() {
            return Err(unresolvable("no addresses".to_string()));
        }

        for ip in &addrs {
            self.check_addr(*ip).map_err(|_| {
                SecurityError::BlockedCidr(format!("{} resolves to {}", host, ip))
            })?;
        }
        Ok(VettedUrl { url: parsed, addrs })
    }

    fn is_trusted(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| self.trusted_hosts.contains(host))
    }

    fn check_addr(&self, ip: IpAddr) -> SecurityResult<()> {
        // ::ffff:10.0.0.1 reaches the same host as 10.0.0.1
        let ip = match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
            v4 => v4,
        };
        if self.private_ranges.iter().any(|range| range.contains(&ip)) {
            return Err(SecurityError::BlockedCidr(ip.to_string()));
        }
        Ok(())
    }
}

fn is_internal_name(name: &str) -> bool {
    INTERNAL_NAMES.iter().any(|internal| {
        if internal.starts_with('.') {
            name.ends_with(internal)
        } else {
            name == *internal
        }
    })
}
