use std::net::IpAddr;

use axum::http::{header, HeaderMap, Uri};
use thiserror::Error;

use crate::config::TenancyConfig;

const MAX_LABEL_LEN: usize = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("Request has no host")]
    MissingHost,

    #[error("Host '{0}' is not served by this deployment")]
    UnknownDomain(String),

    #[error("Nested subdomain '{0}' is not supported")]
    NestedSubdomain(String),

    #[error("Invalid subdomain '{0}'")]
    InvalidSubdomain(String),
}

/// What a request host points at, before the registry is consulted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostScope {
    /// Bare base domain, reserved subdomain, or IP literal
    System,
    /// Subdomain label that should name a trust
    Trust(String),
}

/// Map a raw `Host` value to a [`HostScope`].
///
/// `demo.localhost:3000` resolves to `Trust("demo")` and `localhost:3000`
/// to `System` with the default base domain list.
pub fn resolve_host(raw: &str, tenancy: &TenancyConfig) -> Result<HostScope, HostError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(HostError::MissingHost);
    }

    let host = strip_port(raw);
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return Err(HostError::MissingHost);
    }

    if host.parse::<IpAddr>().is_ok() {
        return Ok(HostScope::System);
    }

    // Longest base first so "school.example.com" wins over "example.com"
    let mut bases: Vec<&str> = tenancy.base_domains.iter().map(String::as_str).collect();
    bases.sort_by_key(|b| std::cmp::Reverse(b.len()));

    for base in bases {
        if host == base {
            return Ok(HostScope::System);
        }

        let Some(label) = host
            .strip_suffix(base)
            .and_then(|rest| rest.strip_suffix('.'))
        else {
            continue;
        };

        if label.contains('.') {
            return Err(HostError::NestedSubdomain(label.to_string()));
        }
        if tenancy.reserved_subdomains.iter().any(|r| r == label) {
            return Ok(HostScope::System);
        }
        if !is_valid_label(label) {
            return Err(HostError::InvalidSubdomain(label.to_string()));
        }
        return Ok(HostScope::Trust(label.to_string()));
    }

    Err(HostError::UnknownDomain(host))
}

/// Pick the host a request was addressed to.
///
/// `X-Forwarded-Host` is only honoured behind a trusted proxy; HTTP/2
/// requests carry the host in the URI authority instead of a header.
pub fn request_host(headers: &HeaderMap, uri: &Uri, trust_proxy_headers: bool) -> Option<String> {
    if trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-host")
            .and_then(|v| v.to_str().ok())
            // Proxies append; the first entry is the client-facing host
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(host) = forwarded {
            return Some(host.to_string());
        }
    }

    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // [::1]:3000
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        // A second colon means an unbracketed IPv6 literal
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
