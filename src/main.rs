use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;

use student_panel::auth::{hash_password, Gate};
use student_panel::config::Config;
use student_panel::{app, AppState};

const PRUNE_EVERY: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "student-panel", version, about = "Student record administration panel")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a PBKDF2 hash for ADMIN_PASSWORD_HASH
    HashPassword {
        #[arg(env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
            Ok(())
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;
    let state = AppState::from_config(&config).await?;
    spawn_session_pruner(Arc::clone(&state.gate));

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    log::info!("Starting student panel on http://{}", config.bind);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

fn spawn_session_pruner(gate: Arc<Gate>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(PRUNE_EVERY);
        loop {
            tick.tick().await;
            let pruned = gate.sessions().prune_expired().await;
            if pruned > 0 {
                log::debug!("Pruned {} expired sessions", pruned);
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                log::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
