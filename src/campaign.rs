//! Single-slot port-scan campaign.
//!
//! A [`Campaign`] owns the one scan record of the process. `start_scan` accepts a
//! target list only when nothing is running, then walks the targets sequentially
//! on a supervised tokio task, publishing each IP's ports as soon as it finishes.
//! Pollers read consistent snapshots with `status`.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use ::time::{format_description::well_known, OffsetDateTime};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::portscan::PortScanner;
use crate::types::ScanStatus;

/// Why a start request was turned down. State is left untouched in every case.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    #[error("No IPs selected")]
    NoTargets,
    #[error("scan already running")]
    AlreadyRunning,
}

/// Acknowledgement for an accepted campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartTicket {
    /// Distinct IPs that will be scanned.
    pub total: usize,
}

#[derive(Debug, Default)]
struct CampaignState {
    status: ScanStatus,
    // Bumped per accepted start so a stale worker can't write into a newer campaign.
    generation: u64,
    cancel: Option<CancellationToken>,
}

/// Handle to the process-wide scan campaign. Cheap to clone.
#[derive(Clone)]
pub struct Campaign {
    inner: Arc<RwLock<CampaignState>>,
    scanner: Arc<dyn PortScanner>,
    idle: Arc<watch::Sender<u64>>,
}

impl Campaign {
    pub fn new(scanner: Arc<dyn PortScanner>) -> Self {
        let (idle, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(CampaignState::default())),
            scanner,
            idle: Arc::new(idle),
        }
    }

    /// Begin scanning `ips` in the background and return immediately.
    ///
    /// Duplicate IPs are scanned once, in first-seen order. Rejected with
    /// [`StartError::NoTargets`] for an empty list and [`StartError::AlreadyRunning`]
    /// while a campaign is in progress.
    pub async fn start_scan(&self, ips: Vec<IpAddr>) -> Result<StartTicket, StartError> {
        let mut seen = HashSet::new();
        let targets: Vec<IpAddr> = ips.into_iter().filter(|ip| seen.insert(*ip)).collect();
        if targets.is_empty() {
            return Err(StartError::NoTargets);
        }
        let total = targets.len();
        let cancel = CancellationToken::new();

        let generation = {
            let mut s = self.inner.write().await;
            if s.status.running {
                return Err(StartError::AlreadyRunning);
            }
            s.generation += 1;
            s.status = ScanStatus {
                running: true,
                total,
                started_at: Some(now_rfc3339()),
                ..Default::default()
            };
            s.cancel = Some(cancel.clone());
            s.generation
        };
        info!(generation, total, "scan campaign started");

        let worker = tokio::spawn(run_campaign(
            self.inner.clone(),
            self.scanner.clone(),
            self.idle.clone(),
            generation,
            targets,
            cancel,
        ));
        tokio::spawn(supervise(
            self.inner.clone(),
            self.idle.clone(),
            generation,
            worker,
        ));

        Ok(StartTicket { total })
    }

    /// Snapshot of the current or most recent campaign.
    pub async fn status(&self) -> ScanStatus {
        self.inner.read().await.status.clone()
    }

    /// Stop the running campaign, keeping whatever results were already published.
    ///
    /// Returns `false` when nothing is running.
    pub async fn cancel(&self) -> bool {
        {
            let mut s = self.inner.write().await;
            if !s.status.running {
                return false;
            }
            if let Some(token) = s.cancel.take() {
                token.cancel();
            }
            s.status.running = false;
            s.status.cancelled = true;
            s.status.finished_at = Some(now_rfc3339());
            info!(
                generation = s.generation,
                scanned = s.status.results.len(),
                "scan campaign cancelled"
            );
        }
        self.idle.send_modify(|n| *n += 1);
        true
    }

    /// Wait until no campaign is running and return the final snapshot.
    pub async fn wait_until_idle(&self) -> ScanStatus {
        let mut rx = self.idle.subscribe();
        loop {
            let status = self.status().await;
            if !status.running {
                return status;
            }
            if rx.changed().await.is_err() {
                return self.status().await;
            }
        }
    }
}

async fn run_campaign(
    inner: Arc<RwLock<CampaignState>>,
    scanner: Arc<dyn PortScanner>,
    idle: Arc<watch::Sender<u64>>,
    generation: u64,
    targets: Vec<IpAddr>,
    cancel: CancellationToken,
) {
    for ip in targets {
        info!(%ip, "scanning ports");
        let mut ports = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            ports = scanner.scan_ports(ip) => ports,
        };
        ports.sort_unstable();
        ports.dedup();

        let mut s = inner.write().await;
        if s.generation != generation || cancel.is_cancelled() {
            return;
        }
        s.status.results.insert(ip, ports);
    }

    {
        let mut s = inner.write().await;
        if s.generation != generation || cancel.is_cancelled() {
            return;
        }
        s.status.running = false;
        s.status.done = true;
        s.status.finished_at = Some(now_rfc3339());
        s.cancel = None;
        info!(generation, scanned = s.status.results.len(), "port scan completed");
    }
    idle.send_modify(|n| *n += 1);
}

/// Clear `running` if the worker died without finishing, so the slot frees up.
async fn supervise(
    inner: Arc<RwLock<CampaignState>>,
    idle: Arc<watch::Sender<u64>>,
    generation: u64,
    worker: JoinHandle<()>,
) {
    let Err(e) = worker.await else {
        return;
    };
    {
        let mut s = inner.write().await;
        if s.generation != generation || !s.status.running {
            return;
        }
        error!(generation, error = %e, "scan worker aborted");
        s.status.running = false;
        s.status.finished_at = Some(now_rfc3339());
        s.cancel = None;
    }
    idle.send_modify(|n| *n += 1);
}

fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
