//! telescreen viewer entry point.
//!
//! Connects to a host, runs the capture loop, and logs frame stats.
//! A windowed presentation layer would subscribe to the same frame
//! channel; headless operation is useful for diagnostics.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use telescreen_viewer::config::ViewerConfig;
use telescreen_viewer::controller::Controller;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "telescreen-viewer", about = "telescreen controller-side viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "telescreen-viewer.toml")]
    config: PathBuf,

    /// Host address (overrides config). Example: 192.168.1.10:4443
    #[arg(long)]
    host: Option<String>,

    /// Check whether the host allows access to this path, then exit.
    #[arg(long)]
    check_path: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewerConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.network.host_addr = host;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("telescreen-viewer v{}", env!("CARGO_PKG_VERSION"));
    info!("connecting to {}", config.network.host_addr);

    let controller = Controller::connect(&config).await?;

    if let Some(path) = cli.check_path {
        let allowed = controller.check_file_access(&path).await?;
        println!("{path}: {}", if allowed { "allowed" } else { "restricted" });
        return Ok(());
    }

    let mut remote_size = controller.remote_size_receiver();
    tokio::spawn(async move {
        if remote_size.changed().await.is_ok()
            && let Some((w, h)) = *remote_size.borrow()
        {
            info!("remote screen: {w}x{h}");
        }
    });

    // Ctrl-C handler.
    let stopper = std::sync::Arc::clone(&controller);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stopper.stop();
    });

    controller.run().await?;

    Ok(())
}
