//! mcat-api - media catalog HTTP service
//!
//! `mcat-api serve` (the default) runs the HTTP server; `mcat-api seed`
//! replaces the catalog with a small demo data set and exits;
//! `mcat-api user disable|enable <name>` toggles an account.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mcat_common::catalog::seed::seed_demo_data;
use mcat_common::config::{resolve_root_folder, ServiceConfig, ROOT_FOLDER_ENV};
use mcat_api::{build_router, AppState};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "mcat-api", version, about = "Media catalog HTTP service")]
struct Cli {
    /// Folder holding the database, uploads and config.toml
    #[arg(long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(long, env = "MCAT_BIND")]
    bind: Option<String>,

    /// Listen port (overrides config)
    #[arg(long, env = "MCAT_PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Replace the catalog with demo albums, songs and artists
    Seed,
    /// Account administration
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Debug, Subcommand)]
enum UserAction {
    /// Reject logins and tokens for an account
    Disable { username: String },
    /// Re-enable a disabled account
    Enable { username: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification before any database work
    info!(
        "Starting mcat-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = Cli::parse();

    let root_folder = resolve_root_folder(cli.root_folder.as_deref(), ROOT_FOLDER_ENV);
    info!("Root folder: {}", root_folder.display());

    let mut config = ServiceConfig::load(&root_folder).context("Failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let state = AppState::initialize(&root_folder, config)
        .await
        .context("Failed to initialize service state")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Seed => {
            let summary = seed_demo_data(&state.db).await?;
            info!(
                "Seeded {} albums, {} songs, {} artists",
                summary.albums, summary.songs, summary.artists
            );
            state.db.close().await;
        }
        Command::User { action } => {
            let (username, disabled) = match action {
                UserAction::Disable { username } => (username, true),
                UserAction::Enable { username } => (username, false),
            };
            state.credentials.set_disabled(&username, disabled).await?;
            state.db.close().await;
        }
        Command::Serve => serve(state).await?,
    }

    Ok(())
}

async fn serve(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config.bind_address, state.config.port);
    let db = state.db.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("mcat-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
