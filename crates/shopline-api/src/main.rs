//! Shopline server.
//!
//! Commands:
//! - `shopline serve` - Run the HTTP API
//! - `shopline init-config` - Write a default config file

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shopline_api::config::{Config, LogFormat, DEFAULT_CONFIG_PATH};
use shopline_api::services::account;
use shopline_api::AppState;
use shopline_db::Db;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Shopline - e-commerce backend
#[derive(Parser)]
#[command(name = "shopline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Write a config file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&cli.config).await,
        Commands::InitConfig { force } => init_config(&cli.config, force),
    }
}

async fn serve(path: &Path) -> Result<()> {
    let config = Config::load(path)?;
    init_tracing(&config);

    let db = Db::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;
    db.migrate().await.context("Failed to run migrations")?;
    account::seed_roles(&db)
        .await
        .context("Failed to seed roles")?;

    let bootstrap = config.bootstrap.clone();
    let bind = config.bind_address();
    let state = AppState::new(config, db)?;

    if let (Some(email), Some(password)) = (&bootstrap.admin_email, &bootstrap.admin_password) {
        account::bootstrap_admin(&state, email, password)
            .await
            .context("Failed to bootstrap admin account")?;
    }

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!(address = %bind, "shopline listening");

    axum::serve(listener, shopline_api::router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.db.close().await;
    info!("shopline stopped");
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Config::default().save(path)?;
    println!("Wrote {}", path.display());
    println!("Set auth.jwt_secret (or SHOPLINE_JWT_SECRET) before starting the server.");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Human => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
