//! Caller address extraction.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Peer placeholder used when the transport did not record a remote address.
pub const UNKNOWN_PEER: &str = "unknown";

/// Transport peer recorded by the listener, or [`UNKNOWN_PEER`].
pub fn peer_address(extensions: &Extensions) -> String {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| UNKNOWN_PEER.to_string())
}

/// Best-effort address of the caller.
///
/// The first `X-Forwarded-For` entry wins unless it is blank. The immediate
/// peer is not checked against a list of trusted proxies, so a client
/// talking to the service directly can claim any address.
pub fn client_address(headers: &HeaderMap, peer: &str) -> String {
    if let Some(first) = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    match split_host_port(peer) {
        Some((host, _)) => host.to_string(),
        None => peer.to_string(),
    }
}

/// Split `host:port` or `[host]:port`. Bare IPv6 addresses and values
/// without a port are rejected.
pub fn split_host_port(addr: &str) -> Option<(&str, &str)> {
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        let port = after.strip_prefix(':')?;
        if port.contains(':') {
            return None;
        }
        return Some((host, port));
    }

    let (host, port) = addr.rsplit_once(':')?;
    if host.contains(':') || host.contains('[') || host.contains(']') {
        return None;
    }
    Some((host, port))
}
