//! CLI entry point for the netmap discovery service.

use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use netmap_core::types::ScanStatus;
use netmap_discover::api::{self, ApiState};
use netmap_discover::config::DiscoverConfig;
use netmap_discover::{prober, ScanManager};

#[derive(Parser)]
#[command(name = "netmap")]
#[command(about = "Discover live hosts on an IPv4 network")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: netmap).
    #[arg(short, long, default_value = "netmap", env = "NETMAP_CONFIG", global = true)]
    config: String,

    /// Replay fixture devices instead of probing the network.
    #[arg(long, global = true)]
    mock: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve,
    /// Run a single scan, print the final job as JSON and exit.
    Scan {
        /// Target to scan (CIDR notation, e.g., 192.168.1.0/24).
        #[arg(short, long)]
        target: String,

        /// Reference node the topology is anchored on.
        #[arg(long, default_value = "")]
        core_switch: String,

        /// How often to poll the job for progress, in milliseconds.
        #[arg(long, default_value_t = 250)]
        poll_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Command::Serve));

    let mut config = DiscoverConfig::load(&cli.config)?;
    config.mock |= cli.mock;

    let manager = ScanManager::new(prober::from_config(&config));

    match cli.command {
        Command::Serve => serve(config, manager).await,
        Command::Scan {
            ref target,
            ref core_switch,
            poll_ms,
        } => {
            let poll = Duration::from_millis(poll_ms.max(1));
            run_once(&manager, target, core_switch, poll).await
        }
    }
}

/// Logs always go to stderr so `scan` output on stdout stays parseable.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn serve(config: DiscoverConfig, manager: ScanManager) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let app = api::create_router(ApiState {
        manager,
        mock_mode: config.mock,
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, mock_mode = config.mock, "NetMap API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Start one scan and poll it to a terminal state. Ctrl-C cancels the scan;
/// the final snapshot is printed either way.
async fn run_once(
    manager: &ScanManager,
    target: &str,
    core_switch: &str,
    poll: Duration,
) -> anyhow::Result<()> {
    let started = manager.start_scan(target, core_switch).await?;
    let id = started.id;

    let mut ctrl_c = std::pin::pin!(tokio::signal::ctrl_c());
    let mut cancel_sent = false;
    let mut reported = 0;
    let mut ticker = tokio::time::interval(poll);

    let finished = loop {
        tokio::select! {
            _ = &mut ctrl_c, if !cancel_sent => {
                cancel_sent = true;
                match manager.cancel_scan(id).await {
                    Ok(_) => tracing::info!(scan_id = %id, "Cancelling scan"),
                    Err(e) => tracing::warn!(scan_id = %id, error = %e, "Cancel rejected"),
                }
            }
            _ = ticker.tick() => {
                let job = manager.get_scan(id).await?;
                if job.discovered_count > reported {
                    reported = job.discovered_count;
                    tracing::info!(scan_id = %id, discovered = reported, "Scan progress");
                }
                if job.status.is_terminal() {
                    break job;
                }
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&finished)?);

    if finished.status == ScanStatus::Failed {
        anyhow::bail!("Scan failed: {}", finished.error);
    }
    Ok(())
}
