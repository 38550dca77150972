use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::oneshot,
};

use crate::{
    cli::App,
    error,
    error::{LinkError, ListenerError},
    info,
    link::LinkCoordinator,
    server::{bind, start_api_server},
    success,
    types::{LinkOutcome, LinkReport, LinkRequest},
    warning,
};

/// Links `requester` to a Last.fm account.
///
/// With `username` the account is linked read-only without authorization.
/// Otherwise the browser authorization flow runs: in this process when the
/// callback port is free, or through the running `utafm serve` listener when
/// it already holds the port.
///
/// # Arguments
///
/// * `requester` - Identifier of the user being linked
/// * `username` - Last.fm username for a read-only link
pub async fn link(requester: &str, username: Option<String>) {
    let app = App::load().await;
    let coordinator = app.coordinator();

    if let Some(username) = username {
        match coordinator.link_read_only(requester, &username).await {
            Ok(session) => success!(
                "Linked {} to {} (read-only).",
                requester,
                session.username()
            ),
            Err(e) => error!("Cannot link account. Err: {}", e),
        }
        return;
    }

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    match bind(&app.config).await {
        Ok(listener) => {
            let server_coordinator = coordinator.clone();
            tokio::spawn(async move {
                let shutdown = async move {
                    let _ = stop_rx.await;
                };
                if let Err(e) = start_api_server(listener, server_coordinator, shutdown).await {
                    tracing::warn!(target: "cli", error = %e, "callback server failed");
                }
            });
        }
        Err(ListenerError::Io(e)) if e.kind() == std::io::ErrorKind::AddrInUse => {
            info!("A callback server is already running, linking through it.");
            let report = link_through_listener(&app.config.listener_url(), requester).await;
            print_report(requester, report);
            return;
        }
        Err(e) => warning!(
            "Callback server unavailable ({}). Waiting for automatic detection or manual confirmation.",
            e
        ),
    }

    let request = match coordinator.start_link(requester).await {
        Ok(r) => r,
        Err(e) => error!("Cannot start authorization. Err: {}", e),
    };

    open_authorization_page(&request);
    info!("Allow access on Last.fm, then press Enter if nothing happens.");

    let outcome = wait_for_outcome(&coordinator, &request.token, requester).await;
    let _ = stop_tx.send(());

    match coordinator.finish_link(requester, outcome).await {
        Ok(report) => print_report(requester, report),
        Err(e) => error!("Cannot save link. Err: {}", e),
    }
}

fn open_authorization_page(request: &LinkRequest) {
    if webbrowser::open(&request.authorization_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            request.authorization_url
        )
    }
}

fn print_report(requester: &str, report: LinkReport) {
    match report {
        LinkReport::Linked { username, source } => {
            info!("{}.", source.describe());
            success!("Linked {} to {}.", requester, username);
        }
        LinkReport::TooManyAccounts {
            username,
            other_accounts,
        } => error!(
            "The Last.fm account {} is already linked to {} other users.",
            username,
            other_accounts
        ),
        LinkReport::Failed | LinkReport::TimedOut => {
            error!("Authorization failed or timed out. Please try again.")
        }
    }
}

/// Runs the flow on a listener started by `utafm serve`. The listener polls
/// and finalizes on its own, so this only starts the attempt and waits.
async fn link_through_listener(base_url: &str, requester: &str) -> LinkReport {
    let client = reqwest::Client::new();

    let request: LinkRequest = match client
        .post(format!("{base_url}/link"))
        .query(&[("requester", requester)])
        .send()
        .await
        .and_then(|r| r.error_for_status())
    {
        Ok(response) => match response.json().await {
            Ok(r) => r,
            Err(e) => error!("Unexpected answer from the callback server. Err: {}", e),
        },
        Err(e) => error!("Cannot start authorization on the callback server. Err: {}", e),
    };

    open_authorization_page(&request);
    info!("Allow access on Last.fm. The callback server detects it automatically.");

    let pb = spinner();
    let report = client
        .get(format!("{base_url}/link/wait"))
        .query(&[("token", request.token.as_str())])
        .send()
        .await
        .and_then(|r| r.error_for_status());
    pb.finish_and_clear();

    match report {
        Ok(response) => match response.json::<LinkReport>().await {
            Ok(report) => report,
            Err(e) => error!("Unexpected answer from the callback server. Err: {}", e),
        },
        Err(e) => error!("Lost the callback server while waiting. Err: {}", e),
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message("Waiting for authorization...");
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}

/// Waits for any producer to settle the attempt. Every line on stdin triggers
/// a manual confirmation.
async fn wait_for_outcome(
    coordinator: &LinkCoordinator,
    token: &str,
    requester: &str,
) -> LinkOutcome {
    let pb = spinner();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let completion = coordinator.await_completion(token);
    tokio::pin!(completion);

    let outcome = loop {
        tokio::select! {
            result = &mut completion => {
                break match result {
                    Ok(outcome) => outcome,
                    Err(_) => LinkOutcome::TimedOut,
                };
            }
            line = lines.next_line(), if stdin_open => {
                if !matches!(line, Ok(Some(_))) {
                    stdin_open = false;
                    continue;
                }
                match coordinator.confirm(token, requester).await {
                    Ok(_) => {}
                    Err(LinkError::NotYetAuthorized) => {
                        pb.println("Not authorized yet. Allow access on Last.fm first.");
                    }
                    Err(e) => pb.println(format!("Confirmation failed: {e}")),
                }
            }
        }
    };

    pb.finish_and_clear();
    outcome
}
