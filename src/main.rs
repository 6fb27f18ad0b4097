use std::net::SocketAddr;

use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};

use auth0_proxy::{api::http::rest::BASE_PATH, app, build_core, config::Config, setup_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    setup_tracing("info");

    match dotenv {
        Ok(path) => info!(message = "Loaded environment file", path = %path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(message = "Ignoring unreadable environment file", error = %err),
    }

    let config = Config::from_env().context("invalid configuration")?;
    let core = build_core(&config).context("failed to build http client")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        message = "Auth0 management proxy listening",
        %addr,
        base_path = BASE_PATH,
        tenant = %config.base_url,
    );

    axum::serve(listener, app(core))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(message = "Failed to listen for Ctrl+C", error = %err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(message = "Failed to listen for SIGTERM", error = %err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
