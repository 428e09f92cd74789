//! Ticker URL handling
//!
//! The feed destination is configured as a single URL parameter. Splitting
//! it into transport pieces and rewriting its path (for the legacy
//! path-only parameter) both live here.

use heapless::String;

use crate::config::MAX_VALUE_LEN;

/// Destination pieces resolved from a ticker URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Destination<'a> {
    pub host: &'a str,
    pub port: u16,
    /// Always begins with `/`
    pub path: &'a str,
    /// Everything except plain `ws` runs over TLS
    pub tls: bool,
}

/// Split `scheme://host[:port][/path]` into transport pieces
///
/// Scheme `ws` selects a plain transport with default port 80; any other
/// scheme selects TLS with default port 443. Returns `None` for URLs
/// without a scheme separator or host, or with an unparseable port.
pub fn parse(url: &str) -> Option<Destination<'_>> {
    let (scheme, rest) = url.split_once("://")?;
    let tls = scheme != "ws";

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    };

    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().ok()?),
        None => (authority, if tls { 443 } else { 80 }),
    };
    if host.is_empty() {
        return None;
    }

    Some(Destination {
        host,
        port,
        path,
        tls,
    })
}

/// Rebuild `url` with its path replaced by `new_path`
///
/// Used for the legacy path-only parameter, which predates full-URL
/// configuration. A missing leading `/` on `new_path` is supplied.
pub fn change_path(url: &str, new_path: &str) -> Option<String<MAX_VALUE_LEN>> {
    let scheme_end = url.find("://")? + 3;
    let authority_len = url[scheme_end..]
        .find('/')
        .unwrap_or(url.len() - scheme_end);

    let mut out = String::new();
    out.push_str(&url[..scheme_end + authority_len]).ok()?;
    if !new_path.starts_with('/') {
        out.push('/').ok()?;
    }
    out.push_str(new_path).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_url() {
        assert_eq!(
            parse("wss://ticker.coinsign.net:443/feed"),
            Some(Destination {
                host: "ticker.coinsign.net",
                port: 443,
                path: "/feed",
                tls: true,
            })
        );
    }

    #[test]
    fn test_plain_scheme_defaults() {
        assert_eq!(
            parse("ws://example.net"),
            Some(Destination {
                host: "example.net",
                port: 80,
                path: "/",
                tls: false,
            })
        );
    }

    #[test]
    fn test_tls_default_port() {
        let dest = parse("wss://example.net/x").unwrap();
        assert_eq!(dest.port, 443);
        assert!(dest.tls);
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(parse("no-scheme.net"), None);
        assert_eq!(parse("ws://"), None);
        assert_eq!(parse("ws://host:port/"), None);
    }

    #[test]
    fn test_change_path() {
        assert_eq!(
            change_path("wss://t.example.net:443/old", "/new").unwrap().as_str(),
            "wss://t.example.net:443/new"
        );
        assert_eq!(
            change_path("ws://t.example.net", "feed").unwrap().as_str(),
            "ws://t.example.net/feed"
        );
        assert_eq!(change_path("garbage", "/x"), None);
    }
}
