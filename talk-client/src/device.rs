//! Device metadata submitted with the login credential.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

const FALLBACK_ADDRESS: &str = "127.0.0.1";
const FALLBACK_SYSTEM_NAME: &str = "My Computer";

/// Where the login comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Local IPv4 address.
    pub access_location: String,
    /// Host name.
    pub system_name: String,
}

impl DeviceInfo {
    /// Create device metadata from explicit values.
    pub fn new(access_location: &str, system_name: &str) -> Self {
        Self {
            access_location: access_location.to_string(),
            system_name: system_name.to_string(),
        }
    }

    /// Detect the local address and host name, falling back to placeholders.
    pub fn detect() -> Self {
        Self {
            access_location: local_ipv4()
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| FALLBACK_ADDRESS.to_string()),
            system_name: system_name(),
        }
    }
}

/// IPv4 source address the OS would pick for an outbound route.
///
/// No packet is sent. `None` when there is no route or the address is
/// loopback or unspecified.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

/// Host name, or `My Computer` if it cannot be read.
pub fn system_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_SYSTEM_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_never_returns_empty_fields() {
        let device = DeviceInfo::detect();
        assert!(!device.access_location.is_empty());
        assert!(!device.system_name.is_empty());
        assert!(device.access_location.parse::<Ipv4Addr>().is_ok());
    }

    #[test]
    fn detected_address_is_not_loopback() {
        if let Some(ip) = local_ipv4() {
            assert!(!ip.is_loopback());
        }
    }

    #[test]
    fn explicit_device() {
        let device = DeviceInfo::new("10.0.0.2", "laptop");
        assert_eq!(device.access_location, "10.0.0.2");
        assert_eq!(device.system_name, "laptop");
    }
}
