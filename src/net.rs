//! LAN address discovery for supervisor status strings.
//!
//! Finds the device's primary non-loopback IPv4 address by opening a UDP
//! socket toward a public endpoint and reading the locally chosen address.
//! No packets are sent.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Sentinel shown when no usable interface address exists.
pub const UNKNOWN_ADDRESS: &str = "unable to determine address";

/// First non-loopback IPv4 address of this device, if any.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:53").ok()?;

    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

/// Address to advertise in status strings.
pub fn advertise_address() -> String {
    local_ipv4()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())
}
