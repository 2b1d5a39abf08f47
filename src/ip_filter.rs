//! Client IP allow/block filtering.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! The client address is read from a configurable request header
//! (`X-Forwarded-For` by default). Clients can set that header themselves,
//! so IP filtering is only meaningful when the gateway sits behind a trusted
//! reverse proxy that **overwrites** (not appends to) the header:
//!
//! ```nginx
//! proxy_set_header X-Forwarded-For $remote_addr;
//! ```
//!
//! # Rules
//!
//! - Endpoint-level config replaces the global config entirely
//! - No configured filter, or no client IP in the header: allow
//! - Unparseable client address: deny
//! - Blocklist is checked first; a match denies
//! - A non-empty allowlist must match, otherwise deny
//! - Malformed list entries are skipped individually

use std::net::IpAddr;

use axum::http::HeaderMap;
use tracing::{debug, warn};

use crate::config::IpFilterConfig;

/// A parsed CIDR block, or a single address with a full-length prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidrRange {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrRange {
    /// Parse CIDR notation (`10.0.0.0/8`, `2001:db8::/32`) or a bare address.
    ///
    /// Returns `None` if the format is invalid.
    pub fn parse(cidr: &str) -> Option<Self> {
        let cidr = cidr.trim();

        let Some((addr, prefix)) = cidr.split_once('/') else {
            let ip = cidr.parse::<IpAddr>().ok()?.to_canonical();
            return Some(Self {
                network: ip,
                prefix_len: max_prefix(&ip),
            });
        };

        let network: IpAddr = addr.parse().ok()?;
        let prefix_len: u8 = prefix.parse().ok()?;
        if prefix_len > max_prefix(&network) {
            return None;
        }

        // IPv4-mapped ranges compare against canonical (IPv4) clients.
        if let IpAddr::V6(v6) = network
            && let Some(v4) = v6.to_ipv4_mapped()
            && prefix_len >= 96
        {
            return Some(Self {
                network: IpAddr::V4(v4),
                prefix_len: prefix_len - 96,
            });
        }

        Some(Self {
            network,
            prefix_len,
        })
    }

    /// Check if an address is contained within this range. Families never
    /// match each other.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (&self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = if self.prefix_len == 0 {
                    0
                } else {
                    u32::MAX << (32 - self.prefix_len)
                };
                (u32::from(*net) & mask) == (u32::from(*addr) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = if self.prefix_len == 0 {
                    0
                } else {
                    u128::MAX << (128 - self.prefix_len)
                };
                (u128::from(*net) & mask) == (u128::from(*addr) & mask)
            }
            _ => false,
        }
    }
}

fn max_prefix(ip: &IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Pick the filter that applies: endpoint config wins over global.
pub fn effective<'a>(
    endpoint: Option<&'a IpFilterConfig>,
    global: Option<&'a IpFilterConfig>,
) -> Option<&'a IpFilterConfig> {
    endpoint.or(global)
}

/// First non-empty comma-separated entry of `header`, trimmed.
///
/// Header lookup is case-insensitive. Repeated headers are scanned in order.
pub fn extract_client_ip<'a>(headers: &'a HeaderMap, header: &str) -> Option<&'a str> {
    headers
        .get_all(header)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .find(|entry| !entry.is_empty())
}

/// Whether the request may proceed.
pub fn check(
    headers: &HeaderMap,
    endpoint: Option<&IpFilterConfig>,
    global: Option<&IpFilterConfig>,
) -> bool {
    let Some(filter) = effective(endpoint, global) else {
        return true;
    };

    let Some(client) = extract_client_ip(headers, &filter.ip_header) else {
        debug!(header = %filter.ip_header, "No client IP in header, allowing");
        return true;
    };

    is_allowed(client, filter)
}

/// Apply blocklist then allowlist to a raw client address string.
pub fn is_allowed(client: &str, filter: &IpFilterConfig) -> bool {
    let Ok(ip) = client.parse::<IpAddr>() else {
        debug!(client = %client, "Unparseable client IP, denying");
        return false;
    };
    let ip = ip.to_canonical();

    if matches_any(&ip, &filter.blocklist) {
        debug!(client = %ip, "Client IP is blocklisted");
        return false;
    }

    if !filter.allowlist.is_empty() && !matches_any(&ip, &filter.allowlist) {
        debug!(client = %ip, "Client IP not in allowlist");
        return false;
    }

    true
}

fn matches_any(ip: &IpAddr, entries: &[String]) -> bool {
    entries
        .iter()
        .filter_map(|entry| {
            let parsed = CidrRange::parse(entry);
            if parsed.is_none() {
                warn!(entry = %entry, "Invalid IP filter entry, skipping");
            }
            parsed
        })
        .any(|range| range.contains(ip))
}
