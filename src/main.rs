use std::net::SocketAddr;
use std::process::ExitCode;

use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use checkin::config::Config;
use checkin::stores::open_stores;
use checkin::web::{build_router, state::AppState};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    // 1. Logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // 2. Configuration and stores
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let stores = match open_stores(&config).await {
        Ok(stores) => stores,
        Err(e) => {
            error!(error = %e, backend = config.backend.as_str(), "could not open stores");
            return ExitCode::FAILURE;
        }
    };

    let state = AppState::new(stores, &config);

    if let Some(bootstrap) = config.bootstrap_admin.as_ref() {
        match state.staff.ensure_admin(bootstrap).await {
            Ok(Some(admin)) => info!(username = %admin.username, "bootstrap admin created"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "bootstrap admin not created"),
        }
    }

    // 3. Router
    let app = build_router(state);

    // 4. Serve, with a fallback port
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(
                host = %config.host,
                port = config.port,
                error = %e,
                "cannot parse listen address"
            );
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            let fallback = SocketAddr::new(addr.ip(), addr.port().saturating_add(1));
            warn!(%addr, %fallback, error = %e, "bind failed, trying fallback port");
            match tokio::net::TcpListener::bind(fallback).await {
                Ok(l) => l,
                Err(e) => {
                    error!(%fallback, error = %e, "cannot bind fallback port");
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    match listener.local_addr() {
        Ok(bound) => info!(addr = %bound, backend = config.backend.as_str(), "server listening"),
        Err(e) => warn!(error = %e, "listening on unknown address"),
    }

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }

    info!("server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "cannot install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "cannot install SIGTERM handler");
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
