//! Best-effort client and host signals.
//!
//! Informational only. Nothing here is used for identity or access
//! decisions, and every signal may be missing.

use axum::http::{header, HeaderMap};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::Arc;

/// Signals describing the calling client.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientFingerprint {
    pub client_ip: Option<String>,
    pub remote_addr: Option<String>,
    pub user_agent: Option<String>,
    /// Brands from `sec-ch-ua`.
    pub platform: Vec<String>,
    pub mobile: Option<String>,
    pub os: Option<String>,
    pub host: Option<Arc<HostIdentity>>,
}

impl ClientFingerprint {
    /// Collect what the headers reveal about the client.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let client_ip = text("x-forwarded-for")
            .and_then(|chain| chain.split(',').next().map(|s| s.trim().to_string()))
            .filter(|ip| ip.parse::<IpAddr>().is_ok())
            .or_else(|| text("x-real-ip").filter(|ip| ip.parse::<IpAddr>().is_ok()));

        let platform = text("sec-ch-ua")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            client_ip,
            remote_addr: None,
            user_agent: text(header::USER_AGENT.as_str()),
            platform,
            mobile: text("sec-ch-ua-mobile"),
            os: text("sec-ch-ua-platform"),
            host: None,
        }
    }

    /// Record the peer address; it also stands in for a missing client IP.
    pub fn set_remote_addr(&mut self, addr: Option<SocketAddr>) {
        if let Some(addr) = addr {
            self.remote_addr = Some(addr.to_string());
            if self.client_ip.is_none() {
                self.client_ip = Some(addr.ip().to_string());
            }
        }
    }
}

/// Identity of the machine serving the request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostIdentity {
    pub hostname: Option<String>,
    pub local_ip: Option<String>,
    /// Interface carrying the default route.
    pub interface_name: Option<String>,
    /// MAC address of that interface.
    pub hardware_addr: Option<String>,
}

impl HostIdentity {
    /// Detect host name and primary local address. Run once at startup.
    pub fn detect() -> Self {
        let hostname = std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .ok()
            .or_else(|| {
                std::fs::read_to_string("/etc/hostname")
                    .ok()
                    .map(|s| s.trim().to_string())
            })
            .filter(|s| !s.is_empty());

        let interface_name = std::fs::read_to_string("/proc/net/route")
            .ok()
            .and_then(|table| default_route_interface(&table));
        let hardware_addr = interface_name.as_deref().and_then(|iface| {
            std::fs::read_to_string(format!("/sys/class/net/{iface}/address"))
                .ok()
                .and_then(|raw| hardware_addr(&raw))
        });

        Self {
            hostname,
            local_ip: primary_local_ip().map(|ip| ip.to_string()),
            interface_name,
            hardware_addr,
        }
    }
}

/// Interface of the first default route in a `/proc/net/route` table.
fn default_route_interface(table: &str) -> Option<String> {
    table.lines().skip(1).find_map(|line| {
        let mut cols = line.split_whitespace();
        let iface = cols.next()?;
        let destination = cols.next()?;
        (destination == "00000000").then(|| iface.to_string())
    })
}

/// Lowercased MAC, or `None` for the all-zero placeholder of virtual links.
fn hardware_addr(raw: &str) -> Option<String> {
    let mac = raw.trim().to_ascii_lowercase();
    let valid = mac.split(':').count() == 6
        && mac.split(':').all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
    (valid && mac != "00:00:00:00:00:00").then_some(mac)
}

/// Address of the interface used for outbound traffic. Connecting a UDP
/// socket sends nothing; it only resolves the route.
fn primary_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("192.0.2.1:9").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_browser_hints_are_captured() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));
        headers.insert(
            "sec-ch-ua",
            HeaderValue::from_static("\"Chromium\";v=\"118\", \"Not=A?Brand\";v=\"99\""),
        );
        headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
        headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"Linux\""));
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));

        let fp = ClientFingerprint::from_headers(&headers);
        assert_eq!(fp.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(fp.platform.len(), 2);
        assert_eq!(fp.mobile.as_deref(), Some("?0"));
        assert_eq!(fp.os.as_deref(), Some("\"Linux\""));
        assert_eq!(fp.client_ip.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_remote_addr_fills_missing_client_ip() {
        let mut fp = ClientFingerprint::from_headers(&HeaderMap::new());
        assert!(fp.client_ip.is_none());
        fp.set_remote_addr(Some("127.0.0.1:5000".parse().unwrap()));
        assert_eq!(fp.client_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(fp.remote_addr.as_deref(), Some("127.0.0.1:5000"));
    }

    #[test]
    fn test_garbage_forwarded_for_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("unknown"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        let fp = ClientFingerprint::from_headers(&headers);
        assert_eq!(fp.client_ip.as_deref(), Some("198.51.100.2"));
    }

    #[test]
    fn test_default_route_interface_is_found() {
        let table = "Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\n\
                     docker0\t000011AC\t00000000\t0001\t0\t0\t0\t0000FFFF\n\
                     eth0\t00000000\t010011AC\t0003\t0\t0\t0\t00000000\n";
        assert_eq!(default_route_interface(table).as_deref(), Some("eth0"));
        assert_eq!(default_route_interface("Iface\tDestination\n"), None);
    }

    #[test]
    fn test_hardware_addr_is_normalized() {
        assert_eq!(
            hardware_addr("02:42:AC:11:00:02\n").as_deref(),
            Some("02:42:ac:11:00:02")
        );
        assert_eq!(hardware_addr("00:00:00:00:00:00\n"), None);
        assert_eq!(hardware_addr("garbage"), None);
    }

    #[test]
    fn test_host_detection_never_panics() {
        let _ = HostIdentity::detect();
    }
}
