use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ReconConfig;
use crate::tools::{ToolError, ToolRunner};

/// Subdomain discovery backed by an external enumeration tool (subfinder by default).
#[derive(Clone)]
pub struct Discoverer {
    runner: Arc<dyn ToolRunner>,
    program: PathBuf,
    timeout: Duration,
}

impl Discoverer {
    pub fn new(runner: Arc<dyn ToolRunner>, config: &ReconConfig) -> Self {
        Self {
            runner,
            program: config.subfinder_bin.clone(),
            timeout: config.discovery_timeout,
        }
    }

    /// Enumerate subdomains of `domain`, degrading to an empty list on any tool failure.
    pub async fn discover(&self, domain: &str) -> Vec<String> {
        match self.try_discover(domain).await {
            Ok(hosts) => hosts,
            Err(e) => {
                warn!(domain = domain.trim(), error = %e, "subdomain discovery failed");
                Vec::new()
            }
        }
    }

    /// Like [`Discoverer::discover`] but surfaces the tool failure.
    pub async fn try_discover(&self, domain: &str) -> Result<Vec<String>, ToolError> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Ok(Vec::new());
        }
        let args = vec!["-d".to_string(), domain.to_string(), "-silent".to_string()];
        let stdout = self.runner.run(&self.program, &args, self.timeout).await?;
        let hosts = parse_hostnames(&stdout);
        info!(domain, count = hosts.len(), "subdomain discovery finished");
        Ok(hosts)
    }
}

/// One hostname per line, deduplicated and sorted.
///
/// Blank lines and anything containing inner whitespace (banners, log
/// messages) are not hostnames and are dropped.
pub fn parse_hostnames(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.contains(char::is_whitespace))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
