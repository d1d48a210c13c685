//! telescreen host entry point.
//!
//! ```text
//! telescreen-host                  Serve with defaults
//! telescreen-host --config <path>  Use custom config TOML
//! telescreen-host --bind <addr>    Override the listen address
//! telescreen-host --gen-config     Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use telescreen_host::config::HostConfig;
use telescreen_host::host::ControlHost;
use telescreen_host::platform;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "telescreen-host", about = "telescreen controlled-side host")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "telescreen-host.toml")]
    config: PathBuf,

    /// Listen address (overrides config). Example: 0.0.0.0:4443
    #[arg(short, long)]
    bind: Option<String>,

    /// Start with remote input injection disabled.
    #[arg(long)]
    no_input: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&HostConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = HostConfig::load(&cli.config);
    if let Some(addr) = cli.bind {
        config.network.bind_addr = addr;
    }
    if cli.no_input {
        config.input.allow_input = false;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("telescreen-host v{}", env!("CARGO_PKG_VERSION"));
    info!("bind address: {}", config.network.bind_addr);
    info!("input forwarding: {}", config.input.allow_input);

    let capture = platform::screen_capture(&config.capture);
    let injector = platform::input_injector();
    let host = ControlHost::new(config, capture, injector);

    for path in host.handle().restricted_paths() {
        info!("restricted: {}", path.display());
    }

    // Ctrl-C handler.
    let stop = host.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    host.run().await?;

    Ok(())
}
