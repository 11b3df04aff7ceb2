//! SSRF guard for caller-supplied source video URLs
//!
//! A source URL is fetched by the server, so it must not point back into our
//! own network. Private, loopback and link-local addresses are refused as
//! literals, after DNS resolution, on every redirect hop, and again when the
//! HTTP client resolves a host to connect to it.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect;
use reqwest::Url;
use tokio::net::lookup_host;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SourceUrlError {
    #[error("Invalid URL format: {0}")]
    Malformed(String),

    #[error("URL must start with http:// or https://")]
    UnsupportedScheme,

    #[error("URL must have a host")]
    MissingHost,

    #[error("URL hostname '{host}' is not in the allowed list")]
    NotAllowlisted { host: String },

    #[error("Private/internal IP addresses are not allowed")]
    PrivateAddress,

    #[error("Localhost and internal hostnames are not allowed")]
    InternalHostname,

    #[error("Hostname resolves to private/internal IP address: {0}")]
    ResolvesToPrivate(IpAddr),

    #[error("Could not resolve hostname '{host}': {reason}")]
    Unresolvable { host: String, reason: String },

    #[error("Too many redirects (max {0})")]
    TooManyRedirects(usize),
}

/// Which source URLs the server is willing to fetch.
#[derive(Debug, Clone, Default)]
pub struct SourceUrlPolicy {
    pub allow_private_ips: bool,
    /// Exact hosts or parent domains; `None` allows every public host.
    pub allowlist: Option<Vec<String>>,
}

impl SourceUrlPolicy {
    pub fn new(allow_private_ips: bool, allowlist: Option<Vec<String>>) -> Self {
        Self {
            allow_private_ips,
            allowlist,
        }
    }

    /// Validate `url` and return it parsed.
    ///
    /// Checks run in order: scheme, host, allowlist, literal address,
    /// internal hostname patterns, then every resolved address. A host that
    /// does not resolve is refused.
    pub async fn check(&self, url: &str) -> Result<Url, SourceUrlError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(SourceUrlError::UnsupportedScheme);
        }

        let parsed = Url::parse(url).map_err(|e| SourceUrlError::Malformed(e.to_string()))?;
        let host = match self.check_target(&parsed)? {
            Some(host) => host,
            None => return Ok(parsed),
        };

        let port = parsed.port_or_known_default().unwrap_or(443);
        let addrs = lookup_host((host.as_str(), port))
            .await
            .map_err(|e| SourceUrlError::Unresolvable {
                host: host.clone(),
                reason: e.to_string(),
            })?;
        for addr in addrs {
            if is_private_ip(&addr.ip()) {
                return Err(SourceUrlError::ResolvesToPrivate(addr.ip()));
            }
        }

        Ok(parsed)
    }

    /// Checks that need no DNS lookup.
    ///
    /// Returns the hostname still to be resolved, or `None` when the target
    /// is already known to be acceptable.
    pub fn check_target(&self, url: &Url) -> Result<Option<String>, SourceUrlError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SourceUrlError::UnsupportedScheme);
        }

        let host = url
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_lowercase())
            .filter(|h| !h.is_empty())
            .ok_or(SourceUrlError::MissingHost)?;

        if let Some(allowed_domains) = &self.allowlist {
            let is_allowed = allowed_domains.iter().any(|allowed| {
                let allowed = allowed.to_lowercase();
                host == allowed || host.ends_with(&format!(".{}", allowed))
            });
            if !is_allowed {
                return Err(SourceUrlError::NotAllowlisted { host });
            }
        }

        if self.allow_private_ips {
            return Ok(None);
        }

        match classify_host(&host) {
            HostKind::Address(ip) if is_private_ip(&ip) => Err(SourceUrlError::PrivateAddress),
            HostKind::Address(_) => Ok(None),
            HostKind::Internal => Err(SourceUrlError::InternalHostname),
            HostKind::Name => Ok(Some(host)),
        }
    }

    /// Redirect policy re-applying [`check_target`](Self::check_target) to
    /// every hop. Hostnames on a hop are covered by [`PublicOnlyResolver`].
    pub fn redirect_policy(&self, max_redirects: usize) -> redirect::Policy {
        let policy = self.clone();
        redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() > max_redirects {
                return attempt.error(SourceUrlError::TooManyRedirects(max_redirects));
            }
            match policy.check_target(attempt.url()) {
                Ok(_) => attempt.follow(),
                Err(e) => {
                    tracing::warn!(target_url = %attempt.url(), error = %e, "Refused redirect");
                    attempt.error(e)
                }
            }
        })
    }
}

/// DNS resolver that never hands a private address to the HTTP client.
///
/// The client connects to whatever this returns, so a name that resolved to a
/// public address during [`SourceUrlPolicy::check`] and to a private one
/// afterwards is still refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicOnlyResolver;

impl Resolve for PublicOnlyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        Box::pin(async move {
            let addrs: Vec<SocketAddr> = lookup_host((host.as_str(), 0)).await?.collect();
            if let Some(private) = addrs.iter().find(|addr| is_private_ip(&addr.ip())) {
                return Err(SourceUrlError::ResolvesToPrivate(private.ip()).into());
            }
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(addrs)
        })
    }
}

enum HostKind {
    Address(IpAddr),
    Internal,
    Name,
}

fn classify_host(host: &str) -> HostKind {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return HostKind::Address(ip);
    }
    if host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.contains(".internal")
        || host.contains(".corp")
    {
        return HostKind::Internal;
    }
    HostKind::Name
}

/// Private, loopback, link-local, multicast, unspecified and unique-local
/// addresses, including IPv4 addresses wrapped in IPv6.
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_private_ipv4(ipv4),
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_ipv4(&mapped);
            }
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || ipv6.is_multicast()
                || is_ipv6_link_local(ipv6)
                || is_ipv6_unique_local(ipv6)
        }
    }
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || octets[0] == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (octets[0] == 100 && (octets[1] & 0xc0) == 64)
}

/// fe80::/10
fn is_ipv6_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

/// fc00::/7
fn is_ipv6_unique_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xfe00 == 0xfc00
}
