use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level follows the `-v` count.
pub fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "recon_scan_rs=info,tower_http=warn",
        1 => "recon_scan_rs=debug,tower_http=info",
        2 => "debug",
        _ => "trace",
    };
    // A second init (tests, embedding) is a no-op rather than a panic.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .try_init();
}
