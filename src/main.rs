// src/main.rs
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use intuipilot_dev::{
    client::ApiClient,
    config::{self, Config},
    health::HealthProbe,
    launcher::{self, LaunchPlan},
};

#[derive(Parser)]
#[command(
    name = "intuipilot-dev",
    version,
    about = "Dev server: serves the front end, proxies /api to the backend",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the front end and proxy the API (the default)
    Serve(ServeArgs),
    /// Call the backend health endpoint once and print the result
    Check(CheckArgs),
}

#[derive(Args, Clone, Default)]
struct ServeArgs {
    /// YAML or JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    backend_host: Option<String>,

    #[arg(long)]
    backend_port: Option<u16>,

    #[arg(long)]
    frontend_host: Option<String>,

    #[arg(long)]
    frontend_port: Option<u16>,

    /// Directory with the built front-end assets
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Only run the backend command
    #[arg(long, conflicts_with = "frontend_only")]
    backend_only: bool,

    /// Only run the dev proxy
    #[arg(long)]
    frontend_only: bool,

    /// Backend command; {host} and {port} are substituted
    #[arg(last = true)]
    backend_command: Vec<String>,
}

#[derive(Args)]
struct CheckArgs {
    /// YAML or JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// API base path or URL, overrides API_BASE
    #[arg(long)]
    api_base: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("intuipilot_dev=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Some(Command::Check(args)) => check(args).await?,
        Some(Command::Serve(args)) => serve(args).await?,
        None => serve(cli.serve).await?,
    };

    // Exit explicitly: the stdin watcher's blocking read would otherwise
    // keep the runtime alive.
    std::process::exit(code);
}

async fn serve(args: ServeArgs) -> Result<i32> {
    let mut config = config::resolve(args.config.as_deref()).await?;
    apply_serve_overrides(&mut config, &args);

    let plan = LaunchPlan {
        backend_command: args.backend_command,
        backend_only: args.backend_only,
        frontend_only: args.frontend_only,
        backend_port_strict: args.backend_port.is_some(),
        frontend_port_strict: args.frontend_port.is_some(),
        watch_stdin: true,
    };
    launcher::run(config, plan).await
}

fn apply_serve_overrides(config: &mut Config, args: &ServeArgs) {
    if let Some(host) = &args.backend_host {
        config.backend.host = host.clone();
        config.backend.origin = None;
    }
    if let Some(port) = args.backend_port {
        config.backend.port = port;
        config.backend.origin = None;
    }
    if let Some(host) = &args.frontend_host {
        config.frontend.host = host.clone();
    }
    if let Some(port) = args.frontend_port {
        config.frontend.port = port;
    }
    if let Some(dir) = &args.static_dir {
        config.frontend.static_dir = Some(dir.clone());
    }
}

async fn check(args: CheckArgs) -> Result<i32> {
    let mut config = config::resolve(args.config.as_deref()).await?;
    if let Some(base) = args.api_base {
        config.client.api_base = base;
    }

    let client = ApiClient::new(&config.client, &config.frontend.origin())?;
    info!(base = %client.base_url(), "checking backend health");

    let probe = HealthProbe::new(Arc::new(client));
    probe.check().await;

    let snapshot = probe.snapshot().await;
    println!("{}", snapshot.display.render());
    Ok(if snapshot.display.is_error() { 1 } else { 0 })
}
