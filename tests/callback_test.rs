mod common;

use std::net::SocketAddr;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use utafm::{
    error::ListenerError,
    link::LinkCoordinator,
    management::UserStore,
    server::start_api_server,
    types::{CompletionSource, LinkOutcome},
};

use common::harness;

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ListenerError>>,
}

async fn spawn_server(coordinator: LinkCoordinator) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let handle = tokio::spawn(start_api_server(listener, coordinator, async move {
        let _ = stopped.await;
    }));

    Running { addr, stop, handle }
}

async fn get(addr: SocketAddr, path: &str) -> (StatusCode, String, String) {
    let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response.text().await.unwrap();
    (status, content_type, body)
}

#[tokio::test]
async fn test_health_returns_ok() {
    let h = harness();
    let server = spawn_server(h.coordinator.clone()).await;

    let (status, content_type, body) = get(server.addr, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_missing_token_is_bad_request() {
    let h = harness();
    let server = spawn_server(h.coordinator.clone()).await;

    let (status, content_type, body) = get(server.addr, "/callback").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(content_type.starts_with("text/html"));
    assert!(body.contains("No token provided"));
}

#[tokio::test]
async fn test_unknown_token_is_not_found() {
    let h = harness();
    let server = spawn_server(h.coordinator.clone()).await;

    let (status, _, body) = get(server.addr, "/callback?token=unknown").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Invalid or expired token"));
}

#[tokio::test]
async fn test_other_paths_are_not_found() {
    let h = harness();
    let server = spawn_server(h.coordinator.clone()).await;

    let (status, _, _) = get(server.addr, "/favicon.ico").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_callback_completes_link() {
    let h = harness();
    let server = spawn_server(h.coordinator.clone()).await;

    let request = h.coordinator.start_link("requester-1").await.unwrap();
    h.provider.authorize(&request.token, "alice<script>");

    let (status, content_type, body) =
        get(server.addr, &format!("/callback?token={}", request.token)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/html"));
    assert!(body.contains("Authorization Successful"));
    assert!(body.contains("alice&lt;script&gt;"));

    assert!(matches!(
        h.coordinator.await_completion(&request.token).await.unwrap(),
        LinkOutcome::Success {
            source: CompletionSource::Callback,
            ..
        }
    ));
    assert!(
        h.store
            .find_user_session("requester-1")
            .await
            .unwrap()
            .is_some()
    );

    // the browser reloading the page still sees success
    let (status, _, _) = get(server.addr, &format!("/callback?token={}", request.token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_failed_exchange_serves_error_page() {
    let h = harness();
    let server = spawn_server(h.coordinator.clone()).await;

    let request = h.coordinator.start_link("requester-1").await.unwrap();

    let (status, _, body) = get(server.addr, &format!("/callback?token={}", request.token)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Authorization Failed"));
    assert_eq!(
        h.coordinator.await_completion(&request.token).await.unwrap(),
        LinkOutcome::Failure
    );
}

#[tokio::test]
async fn test_server_shuts_down_gracefully() {
    let h = harness();
    let server = spawn_server(h.coordinator.clone()).await;

    server.stop.send(()).unwrap();
    let result = server.handle.await.unwrap();

    assert!(result.is_ok());
    assert!(reqwest::get(format!("http://{}/health", server.addr)).await.is_err());
}

#[tokio::test]
async fn test_hosted_link_round_trip() {
    let h = harness();
    let server = spawn_server(h.coordinator.clone()).await;
    let client = reqwest::Client::new();

    let started: Value = client
        .post(format!("http://{}/link", server.addr))
        .query(&[("requester", "requester-1")])
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = started["token"].as_str().unwrap().to_string();
    assert!(
        started["authorization_url"]
            .as_str()
            .unwrap()
            .contains(&format!("token={token}"))
    );

    h.provider.authorize(&token, "alice");
    let (status, _, _) = get(server.addr, &format!("/callback?token={token}")).await;
    assert_eq!(status, StatusCode::OK);

    let response = client
        .get(format!("http://{}/link/wait", server.addr))
        .query(&[("token", token.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report: Value = response.json().await.unwrap();

    assert_eq!(
        report,
        json!({"status": "linked", "username": "alice", "source": "callback"})
    );
    assert!(
        h.store
            .find_user_session("requester-1")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_hosted_link_requires_requester() {
    let h = harness();
    let server = spawn_server(h.coordinator.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/link", server.addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.coordinator.pending().pending_count(), 0);
}

#[tokio::test]
async fn test_waiting_on_unknown_token_is_not_found() {
    let h = harness();
    let server = spawn_server(h.coordinator.clone()).await;

    let (status, content_type, body) = get(server.addr, "/link/wait?token=unknown").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(content_type.starts_with("application/json"));
    assert!(body.contains("Invalid or expired token"));
}
