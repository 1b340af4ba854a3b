use std::net::IpAddr;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::ReconConfig;
use crate::ports::parse_open_ports;
use crate::tools::{ToolError, ToolRunner};

/// Scans one IP and reports its open TCP ports, ascending and deduplicated.
///
/// Implementations never fail: a scan that could not run reports no ports.
#[async_trait]
pub trait PortScanner: Send + Sync {
    async fn scan_ports(&self, ip: IpAddr) -> Vec<u16>;
}

/// [`PortScanner`] that shells out to nmap.
#[derive(Clone)]
pub struct NmapScanner {
    runner: Arc<dyn ToolRunner>,
    program: PathBuf,
    timeout: Duration,
    range: RangeInclusive<u16>,
}

impl NmapScanner {
    pub fn new(runner: Arc<dyn ToolRunner>, config: &ReconConfig) -> Self {
        Self {
            runner,
            program: config.nmap_bin.clone(),
            timeout: config.scan_timeout,
            range: config.port_range.clone(),
        }
    }

    /// Argument list for scanning `ip`: configured range, open ports only.
    pub fn args_for(&self, ip: IpAddr) -> Vec<String> {
        let mut args = vec![
            format!("-p{}-{}", self.range.start(), self.range.end()),
            "--open".to_string(),
            "-T4".to_string(),
        ];
        if ip.is_ipv6() {
            args.push("-6".to_string());
        }
        args.push(ip.to_string());
        args
    }

    pub async fn try_scan_ports(&self, ip: IpAddr) -> Result<Vec<u16>, ToolError> {
        let stdout = self
            .runner
            .run(&self.program, &self.args_for(ip), self.timeout)
            .await?;
        Ok(parse_open_ports(&stdout, &self.range))
    }
}

#[async_trait]
impl PortScanner for NmapScanner {
    async fn scan_ports(&self, ip: IpAddr) -> Vec<u16> {
        match self.try_scan_ports(ip).await {
            Ok(ports) => {
                info!(%ip, open = ports.len(), "port scan finished");
                ports
            }
            Err(e) => {
                warn!(%ip, error = %e, "port scan failed");
                Vec::new()
            }
        }
    }
}
