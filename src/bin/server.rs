use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use cloudfloe::{router, AppState, Config, DuckDbEngine, Gateway, LogFormat};

#[derive(Parser)]
#[command(name = "cloudfloe-server")]
#[command(about = "Query gateway for Iceberg tables on S3-compatible storage")]
struct Args {
    #[arg(long, help = "Path to configuration file (TOML)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Bind address, overrides server.host")]
    host: Option<String>,

    #[arg(long, help = "Listen port, overrides server.port and PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config);
    log_engine_config(&config);

    let engine = Arc::new(DuckDbEngine::new(config.engine.install_extensions));
    let gateway = Arc::new(Gateway::new(engine, &config));

    let preflight = Arc::clone(&gateway);
    if let Err(e) = tokio::task::spawn_blocking(move || preflight.preflight()).await? {
        error!(error = %e, "Engine preflight failed, refusing to start");
        return Err(e.into());
    }

    run_http_server(&config, gateway).await
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .init();
        }
    }
}

fn log_engine_config(config: &Config) {
    info!(
        memory_limit = %config.engine.memory_limit,
        threads = config.engine.threads,
        install_extensions = config.engine.install_extensions,
        "Engine limits"
    );
    match config.server.request_timeout_secs {
        Some(secs) => info!("Request timeout: {}s", secs),
        None => info!("Request timeout: disabled"),
    }
}

async fn run_http_server(config: &Config, gateway: Arc<Gateway>) -> anyhow::Result<()> {
    let state = AppState::new(gateway, &config.server);
    let app = router(state, &config.server.cors_origins);

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!(
                "Cannot bind {}:{}",
                config.server.host, config.server.port
            )
        })?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
