//! Client identity used as the throttling key.
//!
//! The key is a best-effort label, not an authenticated identity. With
//! `trust_forwarded_for` enabled it comes from the first `X-Forwarded-For`
//! hop, which any client can set to anything unless a reverse proxy in
//! front overwrites the header. Only enable it behind such a proxy.
//!
//! Every distinct key that fails authentication gets an entry in the
//! guard's failure table, and entries below the block threshold are kept
//! indefinitely, so spoofed keys also grow that table.

use std::net::SocketAddr;

pub const UNKNOWN_CLIENT: &str = "unknown";

pub fn client_key(
    remote: Option<&SocketAddr>,
    forwarded_for: Option<&str>,
    trust_forwarded_for: bool,
) -> String {
    if trust_forwarded_for
        && let Some(first) = forwarded_for.and_then(first_hop)
    {
        return first.to_string();
    }
    remote.map_or_else(|| UNKNOWN_CLIENT.to_string(), |addr| addr.ip().to_string())
}

fn first_hop(header: &str) -> Option<&str> {
    header
        .split(',')
        .next()
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
}
