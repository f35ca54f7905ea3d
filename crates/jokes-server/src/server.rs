//! Server assembly and lifecycle

use crate::accounts::AccountsClient;
use crate::routes::{routes, AppState};
use jokes_core::{GatewayConfig, JokeService, JokeStoreInvoker};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

/// Startup failures
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// HTTP client for the accounts service could not be built
    #[error("failed to build accounts client: {0}")]
    Client(#[from] reqwest::Error),

    /// Listening socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: warp::Error,
    },
}

impl AppState {
    /// Wire the joke-store invoker and the accounts client from configuration
    ///
    /// # Errors
    /// Returns `ServerError::Client` if the HTTP client cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ServerError> {
        let invoker = JokeStoreInvoker::from_config(&config.store);
        let service = JokeService::new(Arc::new(invoker), config.store.max_string_length);
        let accounts = AccountsClient::new(&config.accounts)?;
        Ok(Self::new(service, Arc::new(accounts)))
    }
}

/// Bind the routes to `addr`
///
/// Returns the bound address (useful with port 0) and the server future,
/// which resolves once `shutdown` completes and in-flight requests drain.
///
/// # Errors
/// Returns `ServerError::Bind` if the address is unavailable.
pub fn bind(
    state: AppState,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, impl Future<Output = ()>), ServerError> {
    warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serve until `shutdown` completes
///
/// # Errors
/// Returns `ServerError` if the client cannot be built or the port cannot be bound.
pub async fn serve(
    config: &GatewayConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let state = AppState::from_config(config)?;
    let (addr, server) = bind(state, config.listen, shutdown)?;
    tracing::info!(%addr, "listening");
    server.await;
    tracing::info!("server stopped");
    Ok(())
}

/// Resolve on Ctrl-C or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}
