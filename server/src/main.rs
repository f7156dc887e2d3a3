use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chat_join_server::config::ServerConfig;
use chat_join_server::engine::backend::ChatBackend;
use chat_join_server::engine::bootstrap::bootstrap;
use chat_join_server::engine::join::JoinService;
use chat_join_server::stream::client::StreamClient;
use chat_join_server::web::app_state::AppState;
use chat_join_server::web::router::build_router;

#[derive(Parser)]
#[command(name = "chat-join-server", version, about = "Join users to the general chat channel")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "chat-join.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A .env file is optional; real environment variables take precedence.
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        info!("loaded environment from {}", path.display());
    }

    let cli = Cli::parse();
    let config = ServerConfig::load(&cli.config).context("failed to load configuration")?;

    let client = StreamClient::from_config(&config.stream)
        .context("failed to create chat backend client")?;
    let backend: Arc<dyn ChatBackend> = Arc::new(client);

    // Admin user and general channel must exist before the first join
    bootstrap(backend.as_ref())
        .await
        .context("failed to bootstrap chat backend")?;

    let join = JoinService::new(
        backend,
        config.stream.api_key.clone(),
        Duration::from_secs(config.join.deadline_secs),
    );

    let app_state = Arc::new(AppState {
        join,
        public_url: config.server.public_url.clone(),
        max_body_bytes: config.server.max_body_bytes,
    });

    let app = build_router(app_state);

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let listener = tokio::net::TcpListener::bind(&config.server.web_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.web_address))?;

    info!("chat-join-server listening on {}", config.server.web_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("server error")?;

    info!("chat-join-server stopped");
    Ok(())
}

/// Cancel `token` on Ctrl-C or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
    token.cancel();
}
