use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::ReconConfig;
use crate::types::ResolutionRecord;

/// DNS record types consulted for liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    A,
    Aaaa,
    Cname,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::A => write!(f, "A"),
            RecordKind::Aaaa => write!(f, "AAAA"),
            RecordKind::Cname => write!(f, "CNAME"),
        }
    }
}

/// One answer from a record-type lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    Addr(IpAddr),
    Alias(String),
}

/// A single record-type lookup produced no answer.
#[derive(Debug, Error)]
#[error("{kind} lookup for {hostname} failed: {reason}")]
pub struct LookupError {
    pub hostname: String,
    pub kind: RecordKind,
    pub reason: String,
}

/// Per record-type DNS query.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn lookup(&self, hostname: &str, kind: RecordKind) -> Result<Vec<RecordData>, LookupError>;
}

/// [`DnsLookup`] over hickory's async resolver.
pub struct HickoryLookup {
    resolver: TokioAsyncResolver,
}

impl HickoryLookup {
    /// System resolver settings, with a single attempt bounded by `config.dns_timeout`.
    pub fn new(config: &ReconConfig) -> Self {
        let (rc, mut opts) = hickory_resolver::system_conf::read_system_conf().unwrap_or_else(|e| {
            warn!(error = %e, "could not read system resolver config, using defaults");
            (ResolverConfig::default(), ResolverOpts::default())
        });
        opts.timeout = config.dns_timeout;
        opts.attempts = 1;
        Self {
            resolver: TokioAsyncResolver::tokio(rc, opts),
        }
    }
}

#[async_trait]
impl DnsLookup for HickoryLookup {
    async fn lookup(&self, hostname: &str, kind: RecordKind) -> Result<Vec<RecordData>, LookupError> {
        let fail = |e: hickory_resolver::error::ResolveError| LookupError {
            hostname: hostname.to_string(),
            kind,
            reason: e.to_string(),
        };
        let data = match kind {
            RecordKind::A => self
                .resolver
                .ipv4_lookup(hostname)
                .await
                .map_err(fail)?
                .iter()
                .map(|a| RecordData::Addr(IpAddr::V4(a.0)))
                .collect(),
            RecordKind::Aaaa => self
                .resolver
                .ipv6_lookup(hostname)
                .await
                .map_err(fail)?
                .iter()
                .map(|a| RecordData::Addr(IpAddr::V6(a.0)))
                .collect(),
            RecordKind::Cname => self
                .resolver
                .lookup(hostname, RecordType::CNAME)
                .await
                .map_err(fail)?
                .iter()
                .map(|r| RecordData::Alias(r.to_string()))
                .collect(),
        };
        Ok(data)
    }
}

/// Resolution adapter: hostname to liveness plus address set.
#[derive(Clone)]
pub struct Resolver {
    lookup: Arc<dyn DnsLookup>,
    ipv6: bool,
}

impl Resolver {
    pub fn new(lookup: Arc<dyn DnsLookup>, ipv6: bool) -> Self {
        Self { lookup, ipv6 }
    }

    /// Record types queried for every hostname.
    pub fn kinds(&self) -> Vec<RecordKind> {
        if self.ipv6 {
            vec![RecordKind::A, RecordKind::Aaaa, RecordKind::Cname]
        } else {
            vec![RecordKind::A, RecordKind::Cname]
        }
    }

    /// Query every record type from [`Resolver::kinds`] concurrently.
    /// Per-type failures count as "no data".
    pub async fn resolve(&self, hostname: &str) -> ResolutionRecord {
        let mut set = JoinSet::new();
        for kind in self.kinds() {
            let lookup = self.lookup.clone();
            let host = hostname.to_string();
            set.spawn(async move { lookup.lookup(&host, kind).await });
        }

        let mut live = false;
        let mut ips = BTreeSet::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(records)) => {
                    live |= !records.is_empty();
                    ips.extend(records.into_iter().filter_map(|r| match r {
                        RecordData::Addr(ip) => Some(ip),
                        RecordData::Alias(_) => None,
                    }));
                }
                Ok(Err(e)) => debug!(error = %e, "no data"),
                Err(e) => warn!(hostname, error = %e, "dns lookup task failed"),
            }
        }

        ResolutionRecord {
            hostname: hostname.to_string(),
            live,
            ips: ips.into_iter().collect(),
        }
    }
}
