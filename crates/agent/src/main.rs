//! `mb360-agent` -- attendance polling daemon.
//!
//! Pulls the attendance log from an MB360 terminal on a fixed interval
//! and forwards punches it has not seen before to the bridge API.
//! See [`AgentConfig::from_env`] for the environment variables.

use std::time::Duration;

use mb360_agent::config::{AgentConfig, Transport};
use mb360_agent::cursor_store::CursorStore;
use mb360_agent::forwarder::HttpForwarder;
use mb360_agent::poller::Poller;
use mb360_agent::session::{DeviceSession, HttpSession, TcpSession};
use mb360_core::cursor::PollCursor;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mb360_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid agent configuration");
        std::process::exit(1);
    });

    tracing::info!(
        device_host = %config.device_host,
        device_port = config.device_port,
        transport = ?config.transport,
        api_url = %config.api_url,
        interval_secs = config.poll_interval_secs,
        "Starting mb360-agent",
    );

    let timeout = Duration::from_secs(config.device_timeout_secs);

    let session = match config.transport {
        Transport::Tcp => DeviceSession::Tcp(TcpSession::new(
            config.device_host.clone(),
            config.device_port,
            timeout,
        )),
        Transport::Http => {
            let host = format!("{}:{}", config.device_host, config.device_port);
            DeviceSession::Http(HttpSession::new(host, timeout).unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to build device HTTP client");
                std::process::exit(1);
            }))
        }
    };

    let forwarder = HttpForwarder::new(&config.api_url, timeout).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build API HTTP client");
        std::process::exit(1);
    });

    let store = config.cursor_file.clone().map(CursorStore::new);
    let cursor = match &store {
        Some(store) => store.load().await.unwrap_or_else(|e| {
            tracing::error!(path = %store.path().display(), error = %e, "Failed to load cursor");
            std::process::exit(1);
        }),
        None => PollCursor::new(),
    };
    tracing::info!(last_seen = ?cursor.last_seen, "Cursor loaded");

    let mut poller = Poller::new(session, forwarder, cursor);
    if let Some(store) = store {
        poller = poller.with_store(store);
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received SIGINT (Ctrl-C), stopping");
                on_signal.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to install Ctrl-C handler"),
        }
    });

    poller
        .run(Duration::from_secs(config.poll_interval_secs), cancel)
        .await;
}
