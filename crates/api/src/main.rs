use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mb360_api::config::ServerConfig;
use mb360_api::relay::{self, RelayServer, RELAY_CHANNEL_CAPACITY};
use mb360_api::router::build_app_router;
use mb360_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mb360_api=debug,mb360_db=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        relay_enabled = config.relay.enabled,
        relay_port = config.relay.port,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = mb360_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    mb360_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    mb360_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let host: IpAddr = config.host.parse().expect("Invalid HOST address");

    // --- Raw TCP relay ---
    let relay_cancel = CancellationToken::new();
    let mut relay_handles = Vec::new();
    if config.relay.enabled {
        let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
        let server = RelayServer::bind(
            SocketAddr::new(host, config.relay.port),
            Duration::from_secs(config.relay.read_timeout_secs),
            config.device_allowlist.clone(),
            tx,
        )
        .await
        .expect("Failed to bind relay address");

        // The server owns the only sender; once it stops, the processor
        // drains what is queued and exits.
        relay_handles.push(tokio::spawn(server.run(relay_cancel.clone())));
        relay_handles.push(tokio::spawn(relay::processor::run(pool.clone(), rx)));
        tracing::info!("Relay started");
    }

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    relay_cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    for handle in relay_handles {
        let _ = tokio::time::timeout(grace, handle).await;
    }
    tracing::info!("Relay shut down");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
