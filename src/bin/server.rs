//! Binary entry point: loads [`wopi_host::config::Config`], wires up the
//! concrete collaborators (`LocalDiskStorage`, `InMemoryTokenAuthority`,
//! `AllowAll`), and serves the router built by [`wopi_host::app`] until a
//! shutdown signal arrives.

use std::process::ExitCode;
use std::sync::Arc;

use wopi_host::access::InMemoryTokenAuthority;
use wopi_host::app::build_router;
use wopi_host::config::Config;
use wopi_host::proof::AllowAll;
use wopi_host::state::AppState;
use wopi_host::storage::LocalDiskStorage;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    pretty_env_logger::init();

    let config = Config::from_env();

    let storage = match LocalDiskStorage::new(&config.storage_root) {
        Ok(storage) => Arc::new(storage),
        Err(err) => {
            log::error!("failed to initialize storage root {:?}: {err}", config.storage_root);
            return ExitCode::FAILURE;
        }
    };

    let machine_name = hostname_or_default();
    let state = AppState::new(storage, Arc::new(InMemoryTokenAuthority::new()), Arc::new(AllowAll), machine_name);
    let router = build_router(state);

    let listener = match tokio::net::TcpListener::bind(&config.listen).await {
        Ok(listener) => listener,
        Err(err) => {
            log::error!("failed to bind {}: {err}", config.listen);
            return ExitCode::FAILURE;
        }
    };
    log::info!("wopi-host listening on {}", config.listen);

    if let Err(err) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        log::error!("server error: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn hostname_or_default() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "wopi-host".to_string())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
