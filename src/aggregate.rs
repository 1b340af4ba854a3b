use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::discovery::Discoverer;
use crate::resolve::Resolver;
use crate::types::ReconReport;

/// Resolve every hostname (in input order) and fold the live ones into a report.
///
/// `all_ips` is the deduplicated union over live hostnames and is what the scan stage consumes.
pub async fn aggregate(domain: &str, hostnames: Vec<String>, resolver: &Resolver) -> ReconReport {
    let mut active_hostnames = Vec::new();
    let mut hostname_to_ips = BTreeMap::new();
    let mut all_ips = BTreeSet::new();

    for host in &hostnames {
        let record = resolver.resolve(host).await;
        if !record.live {
            continue;
        }
        all_ips.extend(record.ips.iter().copied());
        active_hostnames.push(record.hostname.clone());
        hostname_to_ips.insert(record.hostname, record.ips);
    }

    ReconReport {
        domain: domain.to_string(),
        all_hostnames: hostnames,
        active_hostnames,
        hostname_to_ips,
        all_ips: all_ips.into_iter().collect(),
    }
}

/// Discovery followed by resolution and aggregation.
#[derive(Clone)]
pub struct ReconPipeline {
    discoverer: Discoverer,
    resolver: Resolver,
}

impl ReconPipeline {
    pub fn new(discoverer: Discoverer, resolver: Resolver) -> Self {
        Self {
            discoverer,
            resolver,
        }
    }

    pub async fn run(&self, domain: &str) -> ReconReport {
        let domain = domain.trim();
        if domain.is_empty() {
            return ReconReport::default();
        }
        info!(domain, "recon started");
        let hostnames = self.discoverer.discover(domain).await;
        let report = aggregate(domain, hostnames, &self.resolver).await;
        info!(
            domain,
            discovered = report.all_hostnames.len(),
            active = report.active_hostnames.len(),
            ips = report.all_ips.len(),
            "recon finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{DnsLookup, LookupError, RecordData, RecordKind};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct Fixed {
        order: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DnsLookup for Fixed {
        async fn lookup(&self, hostname: &str, kind: RecordKind) -> Result<Vec<RecordData>, LookupError> {
            if kind == RecordKind::A {
                self.order.lock().unwrap().push(hostname.to_string());
            }
            let a = |s: &str| RecordData::Addr(s.parse().unwrap());
            let data = match (hostname, kind) {
                ("a.example.com", RecordKind::A) => vec![a("10.0.0.5"), a("10.0.0.1")],
                ("b.example.com", RecordKind::A) => vec![a("10.0.0.1")],
                ("c.example.com", RecordKind::Cname) => vec![RecordData::Alias("x.cdn.net.".into())],
                _ => {
                    return Err(LookupError {
                        hostname: hostname.into(),
                        kind,
                        reason: "NXDOMAIN".into(),
                    })
                }
            };
            Ok(data)
        }
    }

    #[tokio::test]
    async fn merges_live_hosts_and_dedupes_ips() {
        let dns = Arc::new(Fixed {
            order: Mutex::new(Vec::new()),
        });
        let resolver = Resolver::new(dns.clone(), false);
        let hosts: Vec<String> = ["a.example.com", "b.example.com", "c.example.com", "dead.example.com"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let report = aggregate("example.com", hosts.clone(), &resolver).await;

        assert_eq!(*dns.order.lock().unwrap(), hosts);
        assert_eq!(report.all_hostnames, hosts);
        assert_eq!(
            report.active_hostnames,
            vec!["a.example.com", "b.example.com", "c.example.com"]
        );
        assert!(report.hostname_to_ips["c.example.com"].is_empty());
        let ips: Vec<String> = report.all_ips.iter().map(|i| i.to_string()).collect();
        assert_eq!(ips, vec!["10.0.0.1", "10.0.0.5"]);
    }

    #[tokio::test]
    async fn no_hostnames_no_ips() {
        let resolver = Resolver::new(
            Arc::new(Fixed {
                order: Mutex::new(Vec::new()),
            }),
            false,
        );
        let report = aggregate("example.com", Vec::new(), &resolver).await;
        assert!(report.active_hostnames.is_empty());
        assert!(report.all_ips.is_empty());
    }
}
