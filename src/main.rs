// License registry server
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use license_registry::config::{load_settings, Settings};
use license_registry::logging::init_tracing;
use license_registry::server::{shutdown_signal, RegistryServer};

#[derive(Parser, Debug)]
#[command(name = "license-registry")]
#[command(about = "Coordinates which device holds each license token")]
struct Args {
    /// HTTP port (overrides the port of the configured bind address)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address, e.g. 0.0.0.0:3883
    #[arg(long)]
    bind: Option<String>,

    /// Number of runtime worker threads (defaults to the CPU count)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut settings = load_settings(args.config.as_deref())?;
    apply_overrides(&mut settings, &args)?;

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    if let Some(workers) = args.workers {
        runtime.worker_threads(workers.max(1));
    }
    let runtime = runtime
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    tracing::info!(
        workers = args.workers.unwrap_or_else(|| std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)),
        "Runtime ready"
    );

    runtime.block_on(async move {
        let server = RegistryServer::new(settings)?;
        server.serve(shutdown_signal()).await
    })
}

/// CLI flags take precedence over file and environment settings.
fn apply_overrides(settings: &mut Settings, args: &Args) -> Result<()> {
    if let Some(bind) = &args.bind {
        settings.server.bind_address = bind.clone();
    }
    if let Some(port) = args.port {
        let mut addr: SocketAddr = settings.bind_addr()?;
        addr.set_port(port);
        settings.server.bind_address = addr.to_string();
    }
    settings.validate()?;
    Ok(())
}
