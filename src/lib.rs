//! Library crate for recon-scan-rs: subdomain discovery, DNS resolution and
//! background port-scan campaigns.
pub mod aggregate;
pub mod campaign;
pub mod config;
pub mod discovery;
pub mod logging;
pub mod ports;
pub mod portscan;
pub mod resolve;
pub mod server;
pub mod tools;
pub mod types;
