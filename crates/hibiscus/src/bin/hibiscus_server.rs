//! Hibiscus REST Server
//!
//! HTTP API for cultivar classification and knowledge base maintenance.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use hibiscus::server::startup::{start_server, StoreBackend};
use hibiscus::HibiscusConfig;

#[derive(Parser)]
#[command(name = "hibiscus_server")]
#[command(about = "Hibiscus classification REST API Server")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), ", courtesy of Kernelle Software"))]
struct Args {
  /// Configuration file (defaults to ~/.hibiscus/config.yaml when present)
  #[arg(short, long, env = "HIBISCUS_CONFIG")]
  config: Option<PathBuf>,

  /// Server bind address, overriding the configuration file
  #[arg(long)]
  bind: Option<SocketAddr>,

  /// Keep records in memory instead of LanceDB
  #[arg(long)]
  memory: bool,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let filter = if args.verbose {
    EnvFilter::new("info,lance=warn,lance_datafusion=warn,datafusion=warn")
  } else {
    EnvFilter::new("hibiscus=info,lance=error,lance_datafusion=error,datafusion=error,warn")
  };
  tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
  bentley::set_verbose(args.verbose);

  let config = HibiscusConfig::load(args.config.as_deref())?;
  let addr = args.bind.unwrap_or(config.server.bind);
  let backend = if args.memory { StoreBackend::Memory } else { StoreBackend::LanceDb };

  bentley::info!("Starting Hibiscus REST Server v{}", env!("CARGO_PKG_VERSION"));
  bentley::info!("Binding to address: {addr}");
  if args.verbose {
    bentley::verbose!("Configuration: {config:?}");
  }

  if let Err(e) = start_server(config, addr, backend).await {
    bentley::error!("Server stopped: {e:#}");
    return Err(e);
  }
  Ok(())
}
