//! Numeric address literal parsing
//!
//! IPv4 literals accept the legacy one-to-four part forms, where the last
//! part fills all remaining bytes:
//!
//! | Form | Example | Result |
//! |------|---------|--------|
//! | `a` | `3232235777` | `192.168.1.1` |
//! | `a.b` | `127.1` | `127.0.0.1` |
//! | `a.b.c` | `10.1.258` | `10.1.1.2` |
//! | `a.b.c.d` | `10.0.0.1` | `10.0.0.1` |
//!
//! IPv6 literals may be wrapped in brackets and may carry a `%scope` suffix
//! naming either a numeric scope id or an interface.

use std::net::Ipv6Addr;

/// Scope suffix of an IPv6 literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeSpec {
    /// Numeric scope id (`fe80::1%2`)
    Id(u32),
    /// Interface name (`fe80::1%eth0`)
    Name(String),
}

/// Outcome of classifying a host string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Not a numeric literal; treat as a hostname
    NotLiteral,
    /// Looked like a literal but is malformed (e.g. bad bracketed form)
    Invalid,
    /// IPv4 literal
    V4([u8; 4]),
    /// IPv6 literal with optional scope
    V6 {
        /// Address octets
        octets: [u8; 16],
        /// Scope suffix, if present
        scope: Option<ScopeSpec>,
    },
}

/// Parse an IPv4 literal in any of the one-to-four part decimal forms
///
/// # Example
///
/// ```
/// use rust_inet::addr::parse_ipv4_literal;
///
/// assert_eq!(parse_ipv4_literal("127.1"), Some([127, 0, 0, 1]));
/// assert_eq!(parse_ipv4_literal("256.0.0.1"), None);
/// assert_eq!(parse_ipv4_literal("example.com"), None);
/// ```
#[must_use]
pub fn parse_ipv4_literal(s: &str) -> Option<[u8; 4]> {
    if s.is_empty() {
        return None;
    }

    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() > 4 {
        return None;
    }

    let mut values = Vec::with_capacity(parts.len());
    for part in &parts {
        // Ten digits is enough for u32::MAX; anything longer overflows.
        if part.is_empty() || part.len() > 10 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        values.push(part.parse::<u64>().ok()?);
    }

    let (last, leading) = values.split_last()?;
    if leading.iter().any(|v| *v > 0xFF) {
        return None;
    }

    let tail_bytes = 4 - leading.len();
    let tail_max = (1u64 << (8 * tail_bytes)) - 1;
    if *last > tail_max {
        return None;
    }

    let mut octets = [0u8; 4];
    for (i, v) in leading.iter().enumerate() {
        octets[i] = *v as u8;
    }
    let tail = (*last as u32).to_be_bytes();
    octets[leading.len()..].copy_from_slice(&tail[4 - tail_bytes..]);
    Some(octets)
}

fn parse_scope(scope: &str) -> Option<ScopeSpec> {
    if scope.is_empty() {
        return None;
    }
    if scope.bytes().all(|b| b.is_ascii_digit()) {
        return scope.parse().ok().map(ScopeSpec::Id);
    }
    Some(ScopeSpec::Name(scope.to_string()))
}

fn parse_ipv6(s: &str) -> Option<([u8; 16], Option<ScopeSpec>)> {
    let (addr, scope) = match s.split_once('%') {
        Some((addr, scope)) => (addr, Some(parse_scope(scope)?)),
        None => (s, None),
    };
    let parsed: Ipv6Addr = addr.parse().ok()?;
    Some((parsed.octets(), scope))
}

/// Classify a host string as an IPv4 literal, IPv6 literal, or hostname
///
/// # Example
///
/// ```
/// use rust_inet::addr::{parse_literal, Literal, ScopeSpec};
///
/// assert_eq!(parse_literal("10.0.0.1"), Literal::V4([10, 0, 0, 1]));
/// assert!(matches!(
///     parse_literal("[fe80::1%eth0]"),
///     Literal::V6 { scope: Some(ScopeSpec::Name(_)), .. }
/// ));
/// assert_eq!(parse_literal("[example.com]"), Literal::Invalid);
/// assert_eq!(parse_literal("example.com"), Literal::NotLiteral);
/// ```
#[must_use]
pub fn parse_literal(host: &str) -> Literal {
    if let Some(inner) = host.strip_prefix('[') {
        let Some(inner) = inner.strip_suffix(']') else {
            return Literal::Invalid;
        };
        return match parse_ipv6(inner) {
            Some((octets, scope)) => Literal::V6 { octets, scope },
            None => Literal::Invalid,
        };
    }

    let first = host.chars().next();
    if !matches!(first, Some(c) if c.is_ascii_hexdigit() || c == ':') {
        return Literal::NotLiteral;
    }

    if let Some(octets) = parse_ipv4_literal(host) {
        return Literal::V4(octets);
    }
    if let Some((octets, scope)) = parse_ipv6(host) {
        return Literal::V6 { octets, scope };
    }
    if host.contains('%') || host.contains(':') {
        // A scope suffix or a colon only makes sense on an IPv6 literal.
        return Literal::Invalid;
    }
    Literal::NotLiteral
}
