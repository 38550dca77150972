use crate::{
    cli::App,
    error,
    management::SWEEP_INTERVAL,
    server::{bind, start_api_server},
    success,
};

/// Runs the listener until ctrl-c.
///
/// Besides the OAuth callback it hosts links started with `POST /link`
/// (see `utafm link`, which uses it when the port is taken), so one process
/// owns the pending attempts the callback settles. The response cache
/// sweeper runs alongside.
///
/// # Example Usage
///
/// ```bash
/// OAUTH_PORT=3001 utafm serve
/// ```
pub async fn serve() {
    let app = App::load().await;

    let listener = match bind(&app.config).await {
        Ok(l) => l,
        Err(e) => error!("Cannot start callback server. Err: {}", e),
    };

    let sweeper = app.lastfm.cache().spawn_sweeper(SWEEP_INTERVAL);

    if let Err(e) = start_api_server(listener, app.coordinator(), shutdown_signal()).await {
        error!("Callback server failed. Err: {}", e);
    }

    sweeper.abort();
    success!("Callback server stopped.");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(target: "cli", error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
