#![forbid(unsafe_code)]

mod activation;
mod assets;
mod config;
mod constants;
mod daemon;
mod ipc;
mod orchestrator;
mod profile;
mod shader;
mod tables;
mod watchers;
mod x11_utils;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use activation::{Activator, Gamescope};
use config::{JsonSettings, Paths};
use constants::gamescope;
use daemon::Controller;
use ipc::{IpcClient, IpcServer, Request, Response};
use orchestrator::Orchestrator;
use watchers::TailLogs;

/// Steam Deck OLED panel correction daemon
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the correction daemon
    Daemon(DaemonArgs),

    /// Send one request to a running daemon
    Ctl {
        /// Daemon socket (defaults to the runtime directory)
        #[arg(long)]
        socket: Option<PathBuf>,

        #[command(subcommand)]
        request: Request,
    },
}

#[derive(Args)]
struct DaemonArgs {
    /// Directory holding settings.json
    #[arg(long)]
    settings_dir: Option<PathBuf>,

    /// Bundled shaders to install from
    #[arg(long)]
    shader_dir: Option<PathBuf>,

    #[arg(long)]
    socket: Option<PathBuf>,

    /// X display gamescope runs on
    #[arg(long, default_value = gamescope::DEFAULT_DISPLAY)]
    display: String,
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    // one thread is plenty: everything waits on logs, sockets or xprop
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    match cli.command {
        Command::Daemon(args) => runtime.block_on(run_daemon(args)),
        Command::Ctl { socket, request } => {
            let response = runtime.block_on(send(socket, &request))?;
            println!("{response}");
            if matches!(response, Response::Error(_)) {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

async fn run_daemon(args: DaemonArgs) -> Result<()> {
    let paths = Paths::resolve(args.settings_dir, args.shader_dir)?;
    info!(paths = ?paths, "Resolved paths");

    let settings = JsonSettings::load(&paths.settings_file)?;
    info!(settings = %settings.path().display(), "Loaded settings");
    let activator = Activator::new(Gamescope::new(&args.display));
    let logs = TailLogs::new(&paths);
    let orchestrator = Orchestrator::new(Box::new(settings), paths, activator, args.display);

    let socket = match args.socket {
        Some(path) => path,
        None => ipc::default_socket_path()?,
    };
    let server = IpcServer::bind_to(socket)?;

    Controller::new(orchestrator, logs)?.run(server).await
}

async fn send(socket: Option<PathBuf>, request: &Request) -> Result<Response> {
    let socket = match socket {
        Some(path) => path,
        None => ipc::default_socket_path()?,
    };
    let mut client = IpcClient::connect_to(&socket).await?;
    client.request(request).await
}
