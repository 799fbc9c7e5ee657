//! Public-URL guard.
//!
//! Render targets are fetched by a browser running next to internal
//! services, so anything that could point the engine at loopback, RFC1918
//! space, or the cloud metadata range is rejected before a context is even
//! created. DNS trouble is not a block: an unresolvable host fails
//! naturally at navigation, with a clearer error than this guard could
//! give.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use foldlens_protocols::RenderError;
use tokio::net::lookup_host;
use tracing::debug;
use url::{Host, Url};

const DNS_TIMEOUT: Duration = Duration::from_secs(3);

/// Validate that `raw` is an http(s) URL pointing at a public address.
///
/// Returns the parsed URL on success. A confirmed private destination is
/// `RenderError::Blocked`; shape problems are input errors.
pub async fn ensure_public_http_url(raw: &str) -> Result<Url, RenderError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| RenderError::input("invalid_url", format!("'{}': {}", raw.trim(), e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(RenderError::input(
                "unsupported_scheme",
                format!("scheme '{}' is not renderable, use http or https", other),
            ));
        }
    }

    let host = match url.host() {
        Some(host) => host.to_owned(),
        None => {
            return Err(RenderError::input("invalid_url", "URL has no host"));
        }
    };

    match host {
        Host::Ipv4(ip) => {
            if is_private_v4(ip) {
                return Err(RenderError::Blocked(format!("{} is not public", ip)));
            }
        }
        Host::Ipv6(ip) => {
            if is_private_ip(IpAddr::V6(ip)) {
                return Err(RenderError::Blocked(format!("{} is not public", ip)));
            }
        }
        Host::Domain(name) => {
            let name = name.to_ascii_lowercase();
            if name == "localhost" || name.ends_with(".localhost") || name.ends_with(".local") {
                return Err(RenderError::Blocked(format!(
                    "{} resolves locally by definition",
                    name
                )));
            }
            check_resolved(&name, url.port_or_known_default().unwrap_or(80)).await?;
        }
    }

    Ok(url)
}

/// Resolve and check every address. Resolution failure is fail-open; any
/// private address among the results is fail-closed.
async fn check_resolved(host: &str, port: u16) -> Result<(), RenderError> {
    let lookup = tokio::time::timeout(DNS_TIMEOUT, lookup_host((host, port))).await;
    match lookup {
        Ok(Ok(addrs)) => {
            for addr in addrs {
                if is_private_ip(addr.ip()) {
                    return Err(RenderError::Blocked(format!(
                        "{} resolves to non-public address {}",
                        host,
                        addr.ip()
                    )));
                }
            }
            Ok(())
        }
        Ok(Err(e)) => {
            debug!("DNS lookup for {} failed ({}), allowing through", host, e);
            Ok(())
        }
        Err(_) => {
            debug!("DNS lookup for {} timed out, allowing through", host);
            Ok(())
        }
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
}

/// Address ranges the engine must never fetch from.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_v4(mapped);
            }
            let head = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (head & 0xfe00) == 0xfc00
                || (head & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
#[path = "ssrf_tests.rs"]
mod tests;
