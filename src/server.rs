use std::future::Future;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tokio::net::TcpListener;

use crate::{api, config::Config, error::ListenerError, link::LinkCoordinator};

/// Routes of the callback listener.
pub fn router(coordinator: LinkCoordinator) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback))
        .route("/link", post(api::start_link))
        .route("/link/wait", get(api::wait_link))
        .fallback(api::not_found)
        .layer(Extension(coordinator))
}

/// Binds the configured address.
pub async fn bind(config: &Config) -> Result<TcpListener, ListenerError> {
    let addr = config.server_addr()?;
    Ok(TcpListener::bind(addr).await?)
}

/// Serves the listener routes until `shutdown` resolves.
pub async fn start_api_server<F>(
    listener: TcpListener,
    coordinator: LinkCoordinator,
    shutdown: F,
) -> Result<(), ListenerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(target: "callback", %addr, "callback server listening");

    axum::serve(listener, router(coordinator))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!(target: "callback", "callback server stopped");
    Ok(())
}
