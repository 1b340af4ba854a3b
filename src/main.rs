use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use recon_scan_rs::aggregate::ReconPipeline;
use recon_scan_rs::campaign::Campaign;
use recon_scan_rs::config::{
    ReconConfig, DEFAULT_BIND, DEFAULT_DISCOVERY_TIMEOUT_SECS, DEFAULT_DNS_TIMEOUT_SECS,
    DEFAULT_SCAN_TIMEOUT_SECS,
};
use recon_scan_rs::discovery::Discoverer;
use recon_scan_rs::logging;
use recon_scan_rs::ports::parse_port_range;
use recon_scan_rs::portscan::NmapScanner;
use recon_scan_rs::resolve::{HickoryLookup, Resolver};
use recon_scan_rs::server::{self, AppState};
use recon_scan_rs::tools::CommandRunner;
use recon_scan_rs::types::{ReconReport, ScanStatus};

/// recon-scan-rs — subdomain discovery, DNS resolution and background port scans.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "recon-scan-rs",
    version,
    about = "Subdomain discovery, DNS resolution and background port scans behind a small JSON API.",
    long_about = None
)]
struct Cli {
    /// Run recon for this domain in the terminal instead of serving the API.
    #[arg(long)]
    domain: Option<String>,

    /// With --domain: also port-scan every discovered IP and wait for the result.
    #[arg(long, default_value_t = false, requires = "domain")]
    scan: bool,

    /// Serve the JSON API (default when --domain is not given).
    #[arg(long, default_value_t = false)]
    serve: bool,

    /// Address the API listens on.
    #[arg(long, default_value = DEFAULT_BIND)]
    bind: String,

    /// Subdomain enumeration binary.
    #[arg(long = "subfinder-bin", default_value = "subfinder")]
    subfinder_bin: PathBuf,

    /// Port scanner binary.
    #[arg(long = "nmap-bin", default_value = "nmap")]
    nmap_bin: PathBuf,

    #[arg(long = "discovery-timeout-secs", default_value_t = DEFAULT_DISCOVERY_TIMEOUT_SECS)]
    discovery_timeout_secs: u64,

    /// Timeout of each DNS record-type query.
    #[arg(long = "dns-timeout-secs", default_value_t = DEFAULT_DNS_TIMEOUT_SECS)]
    dns_timeout_secs: u64,

    /// Timeout of each per-IP port scan.
    #[arg(long = "scan-timeout-secs", default_value_t = DEFAULT_SCAN_TIMEOUT_SECS)]
    scan_timeout_secs: u64,

    /// Ports handed to the scanner, e.g. 1-6000.
    #[arg(long = "port-range", default_value = "1-6000")]
    port_range: String,

    /// Also resolve AAAA records.
    #[arg(long, default_value_t = false)]
    ipv6: bool,

    /// Write the terminal-mode report as pretty JSON to this path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn to_config(&self) -> Result<ReconConfig> {
        Ok(ReconConfig {
            subfinder_bin: self.subfinder_bin.clone(),
            nmap_bin: self.nmap_bin.clone(),
            discovery_timeout: Duration::from_secs(self.discovery_timeout_secs),
            dns_timeout: Duration::from_secs(self.dns_timeout_secs),
            scan_timeout: Duration::from_secs(self.scan_timeout_secs),
            port_range: parse_port_range(&self.port_range)
                .with_context(|| format!("--port-range {}", self.port_range))?,
            ipv6: self.ipv6,
            bind: self.bind.clone(),
        })
    }
}

#[derive(Serialize)]
struct TerminalReport<'a> {
    recon: &'a ReconReport,
    scan: Option<&'a ScanStatus>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);
    let config = cli.to_config()?;

    info!(
        subfinder = %config.subfinder_bin.display(),
        nmap = %config.nmap_bin.display(),
        ports = %format!("{}-{}", config.port_range.start(), config.port_range.end()),
        ipv6 = config.ipv6,
        "configuration loaded"
    );

    let runner = Arc::new(CommandRunner);
    let pipeline = ReconPipeline::new(
        Discoverer::new(runner.clone(), &config),
        Resolver::new(Arc::new(HickoryLookup::new(&config)), config.ipv6),
    );
    let campaign = Campaign::new(Arc::new(NmapScanner::new(runner, &config)));

    if let Some(domain) = cli.domain.as_deref() {
        let report = pipeline.run(domain).await;
        print_report(&report);

        let scan = if cli.scan {
            Some(run_scan(&campaign, &report).await)
        } else {
            None
        };
        if let Some(status) = &scan {
            print_scan(status);
        }

        if let Some(path) = cli.output.as_deref() {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(
                file,
                &TerminalReport {
                    recon: &report,
                    scan: scan.as_ref(),
                },
            )?;
            println!("Wrote JSON report to {}", path.display());
        }
        if !cli.serve {
            return Ok(());
        }
    }

    let state = AppState::new(pipeline, campaign);
    tokio::select! {
        res = server::spawn_server(&config.bind, state) => res?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    Ok(())
}

async fn run_scan(campaign: &Campaign, report: &ReconReport) -> ScanStatus {
    match campaign.start_scan(report.all_ips.clone()).await {
        Ok(ticket) => {
            println!("\nScanning {} IP(s)...", ticket.total);
            campaign.wait_until_idle().await
        }
        Err(e) => {
            println!("\nPort scan not started: {e}");
            campaign.status().await
        }
    }
}

fn print_report(report: &ReconReport) {
    println!(
        "\nDomain: {}  discovered: {}  active: {}  unique IPs: {}",
        report.domain,
        report.all_hostnames.len(),
        report.active_hostnames.len(),
        report.all_ips.len()
    );
    let host_w = report
        .active_hostnames
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max("hostname".len());
    println!("{:<host_w$}  {}", "hostname", "ips", host_w = host_w);
    println!("{:-<host_w$}  {:-<3}", "", "", host_w = host_w);
    for host in &report.active_hostnames {
        let ips = report
            .hostname_to_ips
            .get(host)
            .map(|v| {
                v.iter()
                    .map(|ip| ip.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        let ips = if ips.is_empty() { "(alias only)".to_string() } else { ips };
        println!("{:<host_w$}  {}", host, ips, host_w = host_w);
    }
}

fn print_scan(status: &ScanStatus) {
    let ip_w = status
        .results
        .ips()
        .map(|ip| ip.to_string().len())
        .max()
        .unwrap_or(0)
        .max("ip".len());
    println!(
        "\nPort scan: {}/{} IP(s){}",
        status.results.len(),
        status.total,
        if status.cancelled { " (cancelled)" } else { "" }
    );
    println!("{:<ip_w$}  {}", "ip", "open ports", ip_w = ip_w);
    println!("{:-<ip_w$}  {:-<10}", "", "", ip_w = ip_w);
    for (ip, ports) in status.results.iter() {
        let list = ports
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(",");
        println!("{:<ip_w$}  {}", ip.to_string(), list, ip_w = ip_w);
    }
}
