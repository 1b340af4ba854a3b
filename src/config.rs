use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings shared by the adapters and the HTTP server.
#[derive(Debug, Clone)]
pub struct ReconConfig {
    /// Subdomain enumeration binary (invoked as `<bin> -d <domain> -silent`).
    pub subfinder_bin: PathBuf,
    /// Port scanner binary.
    pub nmap_bin: PathBuf,
    pub discovery_timeout: Duration,
    /// Per record-type DNS query timeout.
    pub dns_timeout: Duration,
    /// Per-IP port scan timeout.
    pub scan_timeout: Duration,
    /// Ports handed to the scanner; anything outside is never reported.
    pub port_range: RangeInclusive<u16>,
    /// Also query AAAA records.
    pub ipv6: bool,
    pub bind: String,
}

pub const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_DNS_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_PORT_RANGE: RangeInclusive<u16> = 1..=6000;
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            subfinder_bin: PathBuf::from("subfinder"),
            nmap_bin: PathBuf::from("nmap"),
            discovery_timeout: Duration::from_secs(DEFAULT_DISCOVERY_TIMEOUT_SECS),
            dns_timeout: Duration::from_secs(DEFAULT_DNS_TIMEOUT_SECS),
            scan_timeout: Duration::from_secs(DEFAULT_SCAN_TIMEOUT_SECS),
            port_range: DEFAULT_PORT_RANGE,
            ipv6: false,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}
