use std::collections::HashMap;

use axum::{Extension, extract::Query, http::StatusCode, response::Json};
use serde_json::{Value, json};

use crate::{error::LinkError, link::LinkCoordinator, utils::redact};

type Reply = (StatusCode, Json<Value>);

/// Starts a link hosted by this listener.
///
/// `POST /link?requester=<id>` answers with the token and the URL the user
/// has to open. The listener's own poller, callback route and background
/// finalizer complete the attempt; `GET /link/wait` reports how it ended.
///
/// # Returns
///
/// `200` with `{"token", "authorization_url"}`, `400` without a requester,
/// `502` when Last.fm refuses to issue a token.
pub async fn start_link(
    Query(params): Query<HashMap<String, String>>,
    Extension(coordinator): Extension<LinkCoordinator>,
) -> Reply {
    let Some(requester) = params.get("requester").filter(|r| !r.is_empty()) else {
        return problem(StatusCode::BAD_REQUEST, "No requester provided.");
    };

    match coordinator.start_hosted_link(requester).await {
        Ok(request) => (
            StatusCode::OK,
            Json(json!({
                "token": request.token,
                "authorization_url": request.authorization_url,
            })),
        ),
        Err(e) => {
            tracing::error!(target: "link", requester = %requester, error = %e, "cannot start hosted link");
            problem(StatusCode::BAD_GATEWAY, &e.to_string())
        }
    }
}

/// Long-polls a hosted link until it settles.
///
/// `GET /link/wait?token=<token>` answers with a [`crate::types::LinkReport`]
/// once the attempt is settled, or `404` for a token this listener does not
/// know (never issued here, or already past its deadline).
pub async fn wait_link(
    Query(params): Query<HashMap<String, String>>,
    Extension(coordinator): Extension<LinkCoordinator>,
) -> Reply {
    let Some(token) = params.get("token").filter(|t| !t.is_empty()) else {
        return problem(StatusCode::BAD_REQUEST, "No token provided.");
    };
    let Some(requester) = coordinator.pending().owner(token) else {
        return problem(StatusCode::NOT_FOUND, "Invalid or expired token.");
    };

    tracing::debug!(target: "link", token = %redact(token), "waiting on hosted link");

    match coordinator.complete_link(token, &requester).await {
        Ok(report) => match serde_json::to_value(&report) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(e) => problem(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        },
        Err(LinkError::ExpiredOrUnknownToken) => {
            problem(StatusCode::NOT_FOUND, "Invalid or expired token.")
        }
        Err(e) => problem(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn problem(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "error": message })))
}
