//! HTTP server that executes submitted training snippets
//!
//! Loads the tensor framework once at startup, then serves `/execute`,
//! `/health` and `/runtime`. Submitted code runs with the full privileges of
//! this process; bind it to a trusted network only.

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::net::SocketAddr;
use std::path::PathBuf;
use tensorpad_core::config::{ConfigLoader, ENV_LOG_LEVEL};
use tensorpad_core::{DevicePreference, PythonExecutor, TensorpadConfig};
use tensorpad_http::{shutdown_signal, ServerConfig, TensorpadServer};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Tensorpad Server - Run model training snippets over HTTP")]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(long, short, help = "Configuration file (defaults to ./tensorpad.yaml, then the user config directory)")]
    config: Option<PathBuf>,

    #[clap(long, help = "Address to listen on, e.g. 127.0.0.1:8000")]
    bind_addr: Option<String>,

    #[clap(long, short, help = "Log level: error, warn, info, debug or trace")]
    log_level: Option<String>,

    #[clap(long, help = "Compute device: auto, mps, cuda or cpu")]
    device: Option<DevicePreference>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the execution server (default command)
    Run,
    /// Print the selected compute device and exit
    Device,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging comes up before the config so discovery is visible; the file's
    // level only applies when neither the flag nor the environment set one.
    let early_level = cli
        .log_level
        .clone()
        .or_else(|| std::env::var(ENV_LOG_LEVEL).ok());
    let mut config = match ConfigLoader::load(cli.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            init_logger(early_level.as_deref().unwrap_or("info"), true);
            return Err(e.into());
        }
    };
    init_logger(
        early_level.as_deref().unwrap_or(&config.logging.level),
        config.logging.colored,
    );

    apply_overrides(&mut config, &cli)?;

    match cli.command {
        Some(Commands::Device) => print_device(&config),
        Some(Commands::Run) | None => run_server(config).await,
    }
}

fn init_logger(level: &str, colored: bool) {
    let level_filter = level.parse().unwrap_or(LevelFilter::Info);
    let write_style = if colored {
        env_logger::WriteStyle::Auto
    } else {
        env_logger::WriteStyle::Never
    };
    env_logger::Builder::new()
        .filter_level(level_filter)
        .write_style(write_style)
        .init();
}

fn apply_overrides(config: &mut TensorpadConfig, cli: &Cli) -> Result<()> {
    if let Some(bind_addr) = &cli.bind_addr {
        config.server.bind_addr = bind_addr.clone();
    }
    if let Some(device) = cli.device {
        config.framework.device = device;
    }
    config.validate()?;
    Ok(())
}

fn print_device(config: &TensorpadConfig) -> Result<()> {
    let executor = PythonExecutor::initialize(config)?;
    let metadata = executor.metadata();

    println!("Device: {} ({})", metadata.device, executor.handles().device_kind().description());
    println!(
        "Framework: {} {}",
        metadata.framework,
        metadata.framework_version.as_deref().unwrap_or("(unknown version)")
    );
    println!("Python: {}", metadata.python_version);
    Ok(())
}

async fn run_server(config: TensorpadConfig) -> Result<()> {
    let bind_socket_addr: SocketAddr = config.server.socket_addr()?;
    warn_about_exposure(&bind_socket_addr);

    let executor = PythonExecutor::initialize(&config)?;
    log::info!("Python executor ready.");

    let mut server_config = ServerConfig::default()
        .with_bind_addr(bind_socket_addr)
        .with_cors(config.server.enable_cors)
        .with_max_body_size(config.server.max_body_size)
        .with_logging(config.server.enable_logging);
    if let Some(origins) = config.server.cors_origins.clone() {
        server_config = server_config.with_cors_origins(origins);
    }

    log::info!("Starting Tensorpad server on {}...", bind_socket_addr);

    let server = TensorpadServer::with_config(executor, server_config);

    if let Err(e) = server.serve_with_shutdown(shutdown_signal()).await {
        log::error!("Server failed: {}", e);
        return Err(e.into());
    }

    log::info!("Tensorpad server shut down gracefully.");
    Ok(())
}

fn warn_about_exposure(addr: &SocketAddr) {
    log::warn!("Submitted code runs unrestricted with the privileges of this process.");
    if !addr.ip().is_loopback() {
        log::warn!(
            "Listening on {} is reachable from other hosts; anyone who can connect can run arbitrary code here.",
            addr
        );
    }
}
