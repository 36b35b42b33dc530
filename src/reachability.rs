/*!
 * Network Reachability - "is the device connected right now"
 *
 * The probe reads interface state reported by the operating system. It never
 * sends a packet, so it answers near-instantly and cannot itself eat into the
 * time budget of a background invocation.
 */

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use sysinfo::Networks;
use tracing::trace;

/// Answers whether outbound network access is currently plausible
pub trait ReachabilityProbe: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Probe backed by the operating system's interface table
///
/// Connected means at least one interface carries an address that could route
/// off the machine: not loopback, not unspecified, not link-local.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterfaceProbe;

impl InterfaceProbe {
    pub fn new() -> Self {
        Self
    }
}

impl ReachabilityProbe for InterfaceProbe {
    fn is_connected(&self) -> bool {
        let networks = Networks::new_with_refreshed_list();

        networks.iter().any(|(name, data)| {
            let routable = has_routable_address(data.ip_networks().iter().map(|net| net.addr));
            trace!(interface = %name, routable, "Interface state");
            routable
        })
    }
}

/// Whether any of the addresses could carry traffic off the machine
pub fn has_routable_address(addrs: impl IntoIterator<Item = IpAddr>) -> bool {
    addrs.into_iter().any(|addr| is_routable(&addr))
}

fn is_routable(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => !v4.is_loopback() && !v4.is_unspecified() && !v4.is_link_local(),
        IpAddr::V6(v6) => {
            // fe80::/10 is link-local
            let link_local = (v6.segments()[0] & 0xffc0) == 0xfe80;
            !v6.is_loopback() && !v6.is_unspecified() && !link_local
        }
    }
}

/// Probe with a fixed, switchable answer
#[derive(Debug)]
pub struct StaticProbe {
    connected: AtomicBool,
}

impl StaticProbe {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl ReachabilityProbe for StaticProbe {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
