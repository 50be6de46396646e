pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod services;

use anyhow::Context;
use std::time::Duration;
use tokio::signal;
use tower_sessions::ExpiredDeletion;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    init_tracing(&config.general)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            config.validate()?;
            let prometheus_handle = init_metrics(&config)?;
            serve(config, prometheus_handle).await
        }

        Commands::HashPassword {
            password,
            algorithm,
        } => cmd_hash_password(&config, &password, algorithm.into()).await,

        Commands::Init => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit config.toml and run again.");
            } else {
                println!("config.toml already exists, leaving it untouched.");
            }
            Ok(())
        }
    }
}

fn init_tracing(general: &config::GeneralConfig) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&general.log_level));

    let (plain, json) = if general.json_logs {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(plain)
        .with(json)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

fn init_metrics(config: &Config) -> anyhow::Result<Option<PrometheusHandle>> {
    if !config.observability.metrics_enabled {
        return Ok(None);
    }

    use metrics_exporter_prometheus::PrometheusBuilder;
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics recorder initialized");

    Ok(Some(handle))
}

async fn serve(config: Config, prometheus_handle: Option<PrometheusHandle>) -> anyhow::Result<()> {
    info!("Novaterra v{} starting...", env!("CARGO_PKG_VERSION"));

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    if !config.server.secure_cookies {
        warn!("Session cookies are not marked Secure; use only behind plain-HTTP development setups");
    }

    let cleanup_every = Duration::from_secs(config.server.session_cleanup_interval_seconds);
    let state = api::create_app_state_from_config(config, prometheus_handle).await?;

    let session_cleanup = tokio::spawn(
        state
            .session_store
            .clone()
            .continuously_delete_expired(cleanup_every),
    );
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("🌐 Web Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;

    session_cleanup.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}

async fn cmd_hash_password(
    config: &Config,
    password: &str,
    algorithm: services::HashAlgorithm,
) -> anyhow::Result<()> {
    if password.chars().count() < api::validation::PASSWORD_MIN_LEN {
        warn!(
            "Password is shorter than {} characters; the login endpoints will reject it",
            api::validation::PASSWORD_MIN_LEN
        );
    }

    let hash = services::password::hash_password(password, algorithm, &config.security).await?;
    println!("{hash}");
    Ok(())
}
