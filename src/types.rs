use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// DNS outcome for one candidate hostname.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRecord {
    pub hostname: String,
    pub live: bool,
    pub ips: Vec<IpAddr>,
}

/// Output of the discovery + resolution pipeline for one domain.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconReport {
    pub domain: String,
    #[serde(rename = "allHostnames")]
    pub all_hostnames: Vec<String>,
    #[serde(rename = "activeHostnames")]
    pub active_hostnames: Vec<String>,
    #[serde(rename = "hostnameToIPs")]
    pub hostname_to_ips: BTreeMap<String, Vec<IpAddr>>,
    #[serde(rename = "allIPs")]
    pub all_ips: Vec<IpAddr>,
}

/// Open ports per IP, kept in the order the IPs finished scanning.
///
/// Serializes as a JSON object keyed by the IP string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortMap {
    entries: Vec<(IpAddr, Vec<u16>)>,
}

impl PortMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the finished IP. An IP already present is overwritten in place.
    pub fn insert(&mut self, ip: IpAddr, ports: Vec<u16>) {
        match self.entries.iter_mut().find(|(k, _)| *k == ip) {
            Some(slot) => slot.1 = ports,
            None => self.entries.push((ip, ports)),
        }
    }

    pub fn get(&self, ip: &IpAddr) -> Option<&[u16]> {
        self.entries
            .iter()
            .find(|(k, _)| k == ip)
            .map(|(_, v)| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IpAddr, &[u16])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn ips(&self) -> impl Iterator<Item = &IpAddr> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl Serialize for PortMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (ip, ports) in &self.entries {
            map.serialize_entry(&ip.to_string(), ports)?;
        }
        map.end()
    }
}

/// Snapshot of the current (or most recent) port-scan campaign.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStatus {
    pub running: bool,
    pub done: bool,
    pub cancelled: bool,
    pub total: usize,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub results: PortMap,
}
