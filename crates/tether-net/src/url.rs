//! WebSocket URL decoding.
//!
//! Devices are configured with a plain URL string such as
//! `ws://192.168.1.100:8080/ws`. This module turns it into an
//! [`EndpointDescriptor`] without pulling in a general URL library: only the
//! `ws`/`wss` subset the client can actually dial is accepted.

use std::fmt;
use std::str::FromStr;

use tether_core::logging::targets;

use crate::error::ParseError;

/// Default port for `ws://` and scheme-less URLs.
pub const DEFAULT_PORT: u16 = 80;
/// Default port for `wss://` URLs.
pub const DEFAULT_SECURE_PORT: u16 = 443;

/// A decoded WebSocket endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EndpointDescriptor {
    /// Host name or address. IPv6 literals keep their brackets.
    pub host: String,
    /// TCP port, never zero.
    pub port: u16,
    /// Request path, always starting with `/`.
    pub path: String,
    /// Whether the URL asked for `wss://`.
    pub secure: bool,
}

impl EndpointDescriptor {
    /// Decode `url`, substituting `fallback_path` when the URL carries no
    /// path of its own (no `/` after the authority, or a bare `/`).
    ///
    /// # Example
    ///
    /// ```
    /// use tether_net::url::EndpointDescriptor;
    ///
    /// let ep = EndpointDescriptor::parse("ws://example.com", "/ws").unwrap();
    /// assert_eq!(ep.path, "/ws");
    /// assert_eq!(ep.port, 80);
    /// ```
    pub fn parse(url: &str, fallback_path: &str) -> Result<Self, ParseError> {
        let mut endpoint = parse_url(url)?;
        if endpoint.path == "/" {
            endpoint.path = normalize_path(fallback_path);
        }
        tracing::trace!(target: targets::URL, %endpoint, "parsed endpoint");
        Ok(endpoint)
    }

    /// The `host:port` pair used to open the TCP stream.
    pub fn address(&self) -> String {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        if host.contains(':') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }

    /// The URL scheme this endpoint was parsed from.
    pub fn scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }
}

impl FromStr for EndpointDescriptor {
    type Err = ParseError;

    /// Decode a URL without any fallback path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_url(s)
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}{}", self.scheme(), self.host, self.port, self.path)
    }
}

fn parse_url(url: &str) -> Result<EndpointDescriptor, ParseError> {
    let url = url.trim();

    let (secure, rest) = if let Some(rest) = url.strip_prefix("wss://") {
        (true, rest)
    } else if let Some(rest) = url.strip_prefix("ws://") {
        (false, rest)
    } else if let Some(scheme) = foreign_scheme(url) {
        return Err(ParseError::UnsupportedScheme(scheme.to_string()));
    } else {
        (false, url)
    };

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], rest[idx..].to_string()),
        None => (rest, "/".to_string()),
    };

    let default_port = if secure { DEFAULT_SECURE_PORT } else { DEFAULT_PORT };
    let (host, port) = split_authority(authority, default_port)?;

    if host.is_empty() {
        return Err(ParseError::EmptyHost);
    }

    Ok(EndpointDescriptor {
        host: host.to_string(),
        port,
        path,
        secure,
    })
}

/// The scheme of `url` if it has one. A `://` inside the path or query is
/// not a scheme separator.
fn foreign_scheme(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once("://")?;
    let valid = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Split `host[:port]` on the last `:`, honouring `[v6]:port` literals.
fn split_authority(authority: &str, default_port: u16) -> Result<(&str, u16), ParseError> {
    if authority.starts_with('[') {
        let close = authority
            .find(']')
            .ok_or_else(|| ParseError::UnterminatedIpv6(authority.to_string()))?;
        let host = &authority[..=close];
        return match &authority[close + 1..] {
            "" => Ok((host, default_port)),
            rest => match rest.strip_prefix(':') {
                Some(port) => Ok((host, parse_port(port)?)),
                None => Err(ParseError::InvalidPort(rest.to_string())),
            },
        };
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => Ok((host, parse_port(port)?)),
        None => Ok((authority, default_port)),
    }
}

fn parse_port(port: &str) -> Result<u16, ParseError> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(ParseError::InvalidPort(port.to_string())),
        Ok(port) => Ok(port),
    }
}

fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
