//! The socket abstraction and multicast discovery binding (§4.6, §9
//! "Address-family handling").
//!
//! Grounded on `kwap::socket::Socket`'s `send`/`recv` seam, but backed by
//! `mio::net::UdpSocket` rather than a blocking `nb::Result` spin loop — the
//! endpoint event loop (`core::Endpoint::process`) needs real readiness
//! multiplexing across the primary and discovery sockets, which `nb` alone
//! doesn't give us.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket as Socket2, Type};

use crate::config::COAP_PORT;

/// Minimal send/receive seam so the endpoint can be driven by a real UDP
/// socket in production and an in-memory pair in tests (`testutil::Paired`).
pub trait Socket {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize>;
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

impl Socket for mio::net::UdpSocket {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        mio::net::UdpSocket::send_to(self, buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        mio::net::UdpSocket::recv_from(self, buf)
    }
}

/// Failure binding a primary or discovery socket.
#[derive(Debug)]
pub enum BindError {
    Io(io::Error),
    /// The interface address's family has no corresponding multicast group
    /// defined (only IPv4 and IPv6 are supported).
    UnsupportedFamily,
}

impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            | Self::Io(e) => write!(f, "{e}"),
            | Self::UnsupportedFamily => write!(f, "address family has no defined multicast discovery group"),
        }
    }
}

impl std::error::Error for BindError {}

impl From<io::Error> for BindError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Bind the primary socket an endpoint sends and receives unicast traffic
/// on.
pub fn bind_primary(addr: SocketAddr) -> Result<mio::net::UdpSocket, BindError> {
    let std_sock = std::net::UdpSocket::bind(addr)?;
    std_sock.set_nonblocking(true)?;
    Ok(mio::net::UdpSocket::from_std(std_sock))
}

/// The well-known multicast group this protocol's discovery traffic uses,
/// per address family.
fn discovery_group(family: Domain) -> Option<IpAddr> {
    if family == Domain::IPV4 {
        Some(IpAddr::V4(Ipv4Addr::new(224, 0, 0, 1)))
    } else if family == Domain::IPV6 {
        Some(IpAddr::V6(Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1)))
    } else {
        None
    }
}

/// Bind a discovery socket on `interface_addr`'s family, join the
/// well-known multicast group, and return it ready to register with a
/// poller. Sets `SO_REUSEADDR` before binding so more than one process on
/// the host can listen for discovery traffic concurrently, mirroring
/// `coapy.connection.EndPoint.bindDiscovery`.
pub fn bind_discovery(interface_addr: IpAddr) -> Result<mio::net::UdpSocket, BindError> {
    let domain = match interface_addr {
        | IpAddr::V4(_) => Domain::IPV4,
        | IpAddr::V6(_) => Domain::IPV6,
    };
    let group = discovery_group(domain).ok_or(BindError::UnsupportedFamily)?;

    let socket = Socket2::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    let bind_addr: SocketAddr = SocketAddr::new(group, COAP_PORT);
    socket.bind(&bind_addr.into())?;
    socket.set_nonblocking(true)?;

    match (interface_addr, group) {
        | (IpAddr::V4(iface), IpAddr::V4(grp)) => socket.join_multicast_v4(&grp, &iface)?,
        | (IpAddr::V6(_), IpAddr::V6(grp)) => socket.join_multicast_v6(&grp, 0)?,
        | _ => return Err(BindError::UnsupportedFamily),
    }

    let std_sock: std::net::UdpSocket = socket.into();
    Ok(mio::net::UdpSocket::from_std(std_sock))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_group_matches_address_family() {
        assert_eq!(discovery_group(Domain::IPV4), Some(IpAddr::V4(Ipv4Addr::new(224, 0, 0, 1))));
        assert_eq!(
            discovery_group(Domain::IPV6),
            Some(IpAddr::V6(Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1)))
        );
    }

    #[test]
    fn binding_primary_socket_on_loopback_succeeds() {
        let sock = bind_primary(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)).unwrap();
        assert!(sock.local_addr().unwrap().port() > 0);
    }
}
