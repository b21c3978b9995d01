//! Network printer address resolution.
//!
//! Accepts `IP`, `IP:PORT`, `hostname` and `hostname:PORT`, optionally
//! prefixed with `tcp://`. The port defaults to 9100.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::PrintError;

/// Default raw printing port (JetDirect / RAW).
pub const DEFAULT_PORT: u16 = 9100;

/// Resolve a printer address to a `SocketAddr`.
///
/// For hostnames that resolve to several addresses the first one is used.
pub fn resolve_printer_addr(input: &str) -> Result<SocketAddr, PrintError> {
    let trimmed = input.trim();
    let host = trimmed.strip_prefix("tcp://").unwrap_or(trimmed);
    if host.is_empty() {
        return Err(PrintError::NoAddressFound(input.to_string()));
    }

    if let Ok(addr) = host.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    if let Ok(mut addrs) = host.to_socket_addrs()
        && let Some(addr) = addrs.next()
    {
        return Ok(addr);
    }
    if let Ok(mut addrs) = (host, DEFAULT_PORT).to_socket_addrs()
        && let Some(addr) = addrs.next()
    {
        return Ok(addr);
    }

    Err(PrintError::NoAddressFound(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_with_and_without_port() {
        let addr = resolve_printer_addr("10.0.0.1:6101").unwrap();
        assert_eq!(addr.ip().to_string(), "10.0.0.1");
        assert_eq!(addr.port(), 6101);

        let addr = resolve_printer_addr("192.168.1.55").unwrap();
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn ipv6_forms() {
        assert_eq!(resolve_printer_addr("[::1]:9200").unwrap().port(), 9200);
        let addr = resolve_printer_addr("::1").unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn scheme_prefix_and_whitespace() {
        let addr = resolve_printer_addr("  tcp://127.0.0.1:9101 ").unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 9101);
    }

    #[test]
    fn localhost_defaults_port() {
        let addr = resolve_printer_addr("localhost").unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn unresolvable_inputs() {
        for input in ["no-such-host.invalid", "not a valid address!!!", "", "tcp://"] {
            match resolve_printer_addr(input) {
                Err(PrintError::NoAddressFound(s)) => assert_eq!(s, input),
                other => panic!("expected NoAddressFound for {input:?}, got {other:?}"),
            }
        }
    }
}
