//! Peer address filtering.
//!
//! Coarse network-origin filtering only: with `local_only` set, a peer is
//! admitted only when its address is the loopback address of its family.
//! Rejected sockets are closed before any byte is written.

use std::net::SocketAddr;

/// Address family reported for a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerFamily {
    Ipv4,
    Ipv6,
    /// Anything else (unix sockets, unknown transports).
    Other,
}

const IPV4_LOOPBACK: &str = "127.0.0.1";
const IPV6_LOOPBACK: &str = "::1";
const IPV4_MAPPED_LOOPBACK: &str = "::ffff:127.0.0.1";

/// Decide whether a peer may open a session.
pub fn allow(family: PeerFamily, address: &str, local_only: bool) -> bool {
    if !local_only {
        return true;
    }

    match family {
        PeerFamily::Ipv4 => address == IPV4_LOOPBACK,
        PeerFamily::Ipv6 => address == IPV6_LOOPBACK || address == IPV4_MAPPED_LOOPBACK,
        PeerFamily::Other => false,
    }
}

/// [`allow`] applied to a resolved socket address.
pub fn allow_peer(peer: &SocketAddr, local_only: bool) -> bool {
    let family = match peer {
        SocketAddr::V4(_) => PeerFamily::Ipv4,
        SocketAddr::V6(_) => PeerFamily::Ipv6,
    };
    allow(family, &peer.ip().to_string(), local_only)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "127.0.0.1",
        "127.0.0.2",
        "192.168.0.1",
        "10.0.0.7",
        "0.0.0.0",
        "::1",
        "::ffff:127.0.0.1",
        "::ffff:192.168.0.1",
        "3ffe:1900:4545:3:200:f8ff:fe21:67cf",
        "",
        "localhost",
    ];

    #[test]
    fn ipv4_allows_only_loopback() {
        for address in SAMPLES {
            assert_eq!(
                allow(PeerFamily::Ipv4, address, true),
                *address == "127.0.0.1",
                "address {address}"
            );
        }
    }

    #[test]
    fn ipv6_allows_loopback_and_mapped_loopback() {
        for address in SAMPLES {
            assert_eq!(
                allow(PeerFamily::Ipv6, address, true),
                *address == "::1" || *address == "::ffff:127.0.0.1",
                "address {address}"
            );
        }
    }

    #[test]
    fn remote_access_allows_everything() {
        for family in [PeerFamily::Ipv4, PeerFamily::Ipv6, PeerFamily::Other] {
            for address in SAMPLES {
                assert!(allow(family, address, false));
            }
        }
    }

    #[test]
    fn unknown_family_is_rejected() {
        assert!(!allow(PeerFamily::Other, "127.0.0.1", true));
        assert!(!allow(PeerFamily::Other, "::1", true));
    }

    #[test]
    fn socket_addresses_use_canonical_form() {
        let v4: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let v6: SocketAddr = "[::1]:4000".parse().unwrap();
        let mapped: SocketAddr = "[::ffff:127.0.0.1]:4000".parse().unwrap();
        let remote: SocketAddr = "192.168.0.1:4000".parse().unwrap();

        assert!(allow_peer(&v4, true));
        assert!(allow_peer(&v6, true));
        assert!(allow_peer(&mapped, true));
        assert!(!allow_peer(&remote, true));
        assert!(allow_peer(&remote, false));
    }
}
