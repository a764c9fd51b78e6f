// src/launcher/mod.rs
//! Starts the dev proxy and, optionally, the backend process, then
//! supervises both until one exits, `q` is entered, or a signal arrives.

mod ports;
mod process;

pub use ports::{ensure_port_available, MAX_PORT_ATTEMPTS};
pub use process::{substitute_placeholders, ProcessHandle, TERMINATE_GRACE};

use anyhow::Result;
use std::future::pending;
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::metrics::MetricsRegistry;
use crate::proxy::DevProxy;
use crate::server::{listener::bind_host, RequestHandler, ServerBuilder};

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("--backend-only and --frontend-only cannot be used together")]
    ConflictingModes,

    #[error("--backend-only needs a backend command after `--`")]
    MissingBackendCommand,

    #[error("{0} command is empty")]
    EmptyCommand(String),

    #[error("failed to start {name} ({program}): {source}")]
    Spawn {
        name: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{description} port {port} is already in use; free it or pick another port")]
    PortInUse {
        description: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("no free {description} port in {first}-{last}; specify a free port")]
    NoFreePort {
        description: String,
        first: u16,
        last: u16,
    },
}

/// What to start. Ports marked strict were given explicitly and are never
/// swapped for a neighbour.
#[derive(Debug, Clone, Default)]
pub struct LaunchPlan {
    pub backend_command: Vec<String>,
    pub backend_only: bool,
    pub frontend_only: bool,
    pub backend_port_strict: bool,
    pub frontend_port_strict: bool,
    /// Stop when `q` is entered on stdin.
    pub watch_stdin: bool,
}

impl LaunchPlan {
    pub fn validate(&self) -> Result<(), LaunchError> {
        if self.backend_only && self.frontend_only {
            return Err(LaunchError::ConflictingModes);
        }
        if self.backend_only && self.backend_command.is_empty() {
            return Err(LaunchError::MissingBackendCommand);
        }
        Ok(())
    }

    pub fn launches_backend(&self) -> bool {
        !self.frontend_only && !self.backend_command.is_empty()
    }

    pub fn serves_frontend(&self) -> bool {
        !self.backend_only
    }
}

enum StopReason {
    BackendExited(std::io::Result<ExitStatus>),
    ServerStopped(Result<Result<()>, tokio::task::JoinError>),
    Quit,
    Signal,
}

/// Picks ports, starts what the plan asks for and supervises it. Returns the
/// process exit code.
pub async fn run(config: Config, plan: LaunchPlan) -> Result<i32> {
    let input = plan.watch_stdin.then(tokio::io::stdin);
    supervise(config, plan, input).await
}

/// Settles the ports the plan needs. A backend we start ourselves is always
/// reached at `http://{host}:{port}`, replacing any configured origin.
fn assign_ports(config: &mut Config, plan: &LaunchPlan) -> Result<()> {
    if plan.launches_backend() {
        config.backend.port = ensure_port_available(
            &config.backend.host,
            config.backend.port,
            "backend",
            plan.backend_port_strict,
        )?;
        if let Some(origin) = config.backend.origin.take() {
            info!("[backend] launching locally, ignoring origin {}", origin);
        }
    }
    if plan.serves_frontend() {
        config.frontend.port = ensure_port_available(
            &config.frontend.host,
            config.frontend.port,
            "frontend",
            plan.frontend_port_strict,
        )?;
    }
    config.validate()?;
    Ok(())
}

/// `quit_input` is read line by line for `q`; `None` disables it.
async fn supervise<R>(mut config: Config, plan: LaunchPlan, quit_input: Option<R>) -> Result<i32>
where
    R: AsyncRead + Unpin,
{
    plan.validate()?;
    assign_ports(&mut config, &plan)?;

    let mut backend = if plan.launches_backend() {
        let command = substitute_placeholders(
            &plan.backend_command,
            &config.backend.host,
            config.backend.port,
        );
        Some(ProcessHandle::spawn("backend", &command)?)
    } else {
        None
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server = if plan.serves_frontend() {
        Some(start_frontend(&config, shutdown_rx).await?)
    } else {
        None
    };

    if plan.watch_stdin && std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        println!("\nEnter q to stop all services.");
    }

    // Lives across loop passes so a pending read never loses a line.
    let quit = wait_for_quit(quit_input);
    tokio::pin!(quit);

    let mut exit_code = 0;
    loop {
        let reason = {
            let backend_exit = async {
                match backend.as_mut() {
                    Some(handle) => handle.wait().await,
                    None => pending().await,
                }
            };
            let server_exit = async {
                match server.as_mut() {
                    Some(handle) => handle.await,
                    None => pending().await,
                }
            };

            tokio::select! {
                status = backend_exit => StopReason::BackendExited(status),
                result = server_exit => StopReason::ServerStopped(result),
                _ = &mut quit => StopReason::Quit,
                _ = shutdown_signal() => StopReason::Signal,
            }
        };

        match reason {
            StopReason::BackendExited(Ok(status)) if status.success() => {
                info!("[backend] exited");
                backend = None;
                if server.is_some() {
                    continue;
                }
            }
            StopReason::BackendExited(Ok(status)) => {
                warn!("[backend] exited with {}", status);
                exit_code = status.code().unwrap_or(1);
            }
            StopReason::BackendExited(Err(e)) => {
                error!("[backend] wait failed: {}", e);
                exit_code = 1;
            }
            StopReason::ServerStopped(result) => {
                server = None;
                match result {
                    Ok(Ok(())) => info!("[frontend] stopped"),
                    Ok(Err(e)) => {
                        error!("[frontend] server error: {:#}", e);
                        exit_code = 1;
                    }
                    Err(e) => {
                        error!("[frontend] server task failed: {}", e);
                        exit_code = 1;
                    }
                }
            }
            StopReason::Quit => info!("received q, shutting down"),
            StopReason::Signal => info!("Shutdown signal received"),
        }
        break;
    }

    let _ = shutdown_tx.send(true);
    if let Some(handle) = backend.as_mut() {
        handle.terminate().await;
    }
    if let Some(handle) = server {
        match handle.await {
            Ok(Err(e)) => error!("[frontend] server error: {:#}", e),
            Err(e) => error!("[frontend] server task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    Ok(exit_code)
}

async fn start_frontend(
    config: &Config,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<JoinHandle<Result<()>>> {
    let mut proxy = DevProxy::from_config(config)?;
    if config.metrics.enabled {
        let registry = MetricsRegistry::new()?;
        proxy = proxy.with_metrics(registry, Some(config.metrics.path.clone()));
    }
    info!(
        "[frontend] proxying {} -> {}",
        proxy.rule().prefix(),
        proxy.rule().target_origin()
    );
    if let Some(dir) = &config.frontend.static_dir {
        info!("[frontend] serving static files from {}", dir.display());
    }

    let listener = bind_host(&config.frontend.host, config.frontend.port).await?;
    let builder = ServerBuilder::new(listener)?
        .with_handler(RequestHandler::new(Arc::new(proxy)));

    Ok(tokio::spawn(async move {
        builder
            .serve_with_shutdown(async move {
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await
    }))
}

/// Resolves once a line reading `q` arrives. Never resolves if the input
/// closes first or there is none.
async fn wait_for_quit<R: AsyncRead + Unpin>(input: Option<R>) {
    let Some(input) = input else {
        return pending().await;
    };
    let mut lines = BufReader::new(input).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().eq_ignore_ascii_case("q") {
            return;
        }
    }
    pending::<()>().await
}

// Graceful shutdown handler
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
