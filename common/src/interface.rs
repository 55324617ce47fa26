//! Resolution of a network interface selector to the local address a listener should bind to.
//!
//! A selector is one of:
//! - a wildcard (anything starting with `0`, like `0.0.0.0` or `0/0`, or `::`), passed through as-is
//! - a CIDR range, in which one of this machine's addresses is expected to fall
//! - the name of a network interface, whose IPv4 address is used

use core::fmt;
use std::net::{IpAddr, SocketAddrV4, SocketAddrV6};

use ipnet::IpNet;
use nix::ifaddrs::getifaddrs;
use thiserror::Error as ThisError;

/// The outcome of resolving an interface selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Listen on all interfaces, spelled however the operator spelled it.
    Wildcard(String),
    /// Listen on this specific local address.
    Address(IpAddr),
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Wildcard(ref raw) => f.write_str(raw),
            Self::Address(ref addr) => write!(f, "{addr}"),
        }
    }
}

/// Errors returned by [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ResolveError {
    #[error("This machine does not have an interface '{0}'")]
    UnknownInterface(String),
    #[error("This machine has no interfaces in CIDR range {0}")]
    NoMatchingInterface(String),
    #[error("'{0}' looks like a CIDR range but is not a valid network")]
    InvalidRange(String),
    #[error("Failed to enumerate network interfaces: {0}")]
    Enumerate(String),
}

/// A single address configured on a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddr {
    pub name: String,
    pub addr: IpAddr,
}

/// Source of the local interface table.
///
/// Implementations must return addresses in a stable order for a given host state.
pub trait InterfaceSource {
    /// Lists every IPv4 and IPv6 address configured on this machine.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Enumerate`] if the table cannot be read.
    fn addresses(&self) -> Result<Vec<InterfaceAddr>, ResolveError>;
}

/// Reads the interface table of the running host via `getifaddrs(3)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn addresses(&self) -> Result<Vec<InterfaceAddr>, ResolveError> {
        let ifaddrs = getifaddrs().map_err(|e| ResolveError::Enumerate(e.to_string()))?;

        let mut found = ifaddrs
            .filter_map(|ifa| {
                let storage = ifa.address?;
                let addr = if let Some(&v4) = storage.as_sockaddr_in() {
                    IpAddr::V4(*SocketAddrV4::from(v4).ip())
                } else if let Some(&v6) = storage.as_sockaddr_in6() {
                    IpAddr::V6(*SocketAddrV6::from(v6).ip())
                } else {
                    return None;
                };
                Some(InterfaceAddr {
                    name: ifa.interface_name,
                    addr,
                })
            })
            .collect::<Vec<_>>();

        // Stable sort: kernel order is kept within an interface and address family.
        found.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.addr.is_ipv6().cmp(&b.addr.is_ipv6()))
        });
        Ok(found)
    }
}

/// Returns `true` if the selector means "bind all interfaces".
pub fn is_wildcard(specifier: &str) -> bool {
    specifier.starts_with('0') || specifier == "::"
}

/// Returns `true` if the selector has the shape of an IPv4 or a fully written IPv6 range.
pub fn is_cidr(specifier: &str) -> bool {
    specifier.split('.').count() == 4 || specifier.split(':').count() == 8
}

/// Resolves a selector against this machine's interfaces.
///
/// # Errors
///
/// See [`resolve_with`].
pub fn resolve(specifier: &str) -> Result<Binding, ResolveError> {
    resolve_with(specifier, &SystemInterfaces)
}

/// Resolves a selector against the given interface table.
///
/// # Errors
///
/// - [`ResolveError::NoMatchingInterface`] if no local address lies in the given range
/// - [`ResolveError::UnknownInterface`] if the named interface doesn't exist or has no IPv4 address
/// - [`ResolveError::InvalidRange`] if a CIDR-shaped selector can't be parsed
/// - [`ResolveError::Enumerate`] if the interface table can't be read
pub fn resolve_with<S: InterfaceSource + ?Sized>(
    specifier: &str,
    source: &S,
) -> Result<Binding, ResolveError> {
    if is_wildcard(specifier) {
        return Ok(Binding::Wildcard(specifier.to_owned()));
    }

    if is_cidr(specifier) {
        let network = parse_network(specifier)?;
        source
            .addresses()?
            .into_iter()
            .map(|entry| entry.addr)
            .filter(|addr| !is_link_local(addr))
            .find(|addr| network.contains(addr))
            .map(Binding::Address)
            .ok_or_else(|| ResolveError::NoMatchingInterface(specifier.to_owned()))
    } else {
        source
            .addresses()?
            .into_iter()
            .find(|entry| entry.name == specifier && entry.addr.is_ipv4())
            .map(|entry| Binding::Address(entry.addr))
            .ok_or_else(|| ResolveError::UnknownInterface(specifier.to_owned()))
    }
}

/// Parses `a.b.c.d/len` style ranges; a bare address is a single-host network.
fn parse_network(specifier: &str) -> Result<IpNet, ResolveError> {
    let invalid = || ResolveError::InvalidRange(specifier.to_owned());
    if let Ok(network) = specifier.parse::<IpNet>() {
        return Ok(network);
    }
    let addr = specifier.parse::<IpAddr>().map_err(|_| invalid())?;
    let host_len = if addr.is_ipv4() { 32 } else { 128 };
    IpNet::new(addr, host_len).map_err(|_| invalid())
}

/// `fe80::/10` addresses are reported by the OS but can't be used for external binding.
fn is_link_local(addr: &IpAddr) -> bool {
    match *addr {
        IpAddr::V4(_) => false,
        IpAddr::V6(v6) => v6.is_unicast_link_local(),
    }
}
