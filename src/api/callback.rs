use std::collections::HashMap;

use axum::{
    Extension,
    extract::Query,
    http::StatusCode,
    response::Html,
};

use crate::{
    error::LinkError,
    link::{CallbackResult, LinkCoordinator},
    utils::redact,
};

type Page = (StatusCode, Html<String>);

/// Completes a link when Last.fm redirects the browser back with `?token=`.
///
/// | Situation                                | Status |
/// |------------------------------------------|--------|
/// | no `token` parameter                     | 400    |
/// | token unknown, expired or already failed | 404    |
/// | linked, or already linked by the poller  | 200    |
/// | Last.fm account over the alt allowance   | 403    |
/// | token exchange failed                    | 500    |
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(coordinator): Extension<LinkCoordinator>,
) -> Page {
    let Some(token) = params.get("token").filter(|t| !t.is_empty()) else {
        return page(
            StatusCode::BAD_REQUEST,
            "❌",
            "Error",
            "No token provided.",
        );
    };

    tracing::info!(target: "callback", token = %redact(token), "received callback");

    match coordinator.complete_from_callback(token).await {
        Ok(CallbackResult::Linked { username } | CallbackResult::AlreadyLinked { username }) => {
            page(
                StatusCode::OK,
                "✅",
                "Authorization Successful!",
                &format!(
                    "Your Last.fm account <strong>{}</strong> has been linked. \
                     You can now close this window.",
                    escape(&username)
                ),
            )
        }
        Ok(CallbackResult::TooManyAccounts {
            username,
            other_accounts,
        }) => page(
            StatusCode::FORBIDDEN,
            "⛔",
            "Too Many Linked Accounts",
            &format!(
                "The Last.fm account <strong>{}</strong> is already linked to {} other users.",
                escape(&username),
                other_accounts
            ),
        ),
        Err(LinkError::ExpiredOrUnknownToken) => page(
            StatusCode::NOT_FOUND,
            "❌",
            "Error",
            "Invalid or expired token.",
        ),
        Err(e) => {
            tracing::error!(target: "callback", error = %e, "failed to complete authorization");
            page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "❌",
                "Authorization Failed",
                "Something went wrong while linking your Last.fm account. Please try again.",
            )
        }
    }
}

/// Router fallback.
pub async fn not_found() -> Page {
    page(StatusCode::NOT_FOUND, "❓", "Not Found", "Nothing to see here.")
}

fn page(status: StatusCode, icon: &str, title: &str, body: &str) -> Page {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Last.fm - {title}</title>
  <style>
    body {{ font-family: Arial, sans-serif; display: flex; justify-content: center;
           align-items: center; height: 100vh; margin: 0; background: #f4f4f4; }}
    .container {{ background: white; padding: 40px; border-radius: 10px;
                 box-shadow: 0 10px 40px rgba(0,0,0,0.2); text-align: center; max-width: 500px; }}
    .icon {{ font-size: 60px; margin-bottom: 20px; }}
    h1 {{ color: #d51007; }}
    p {{ color: #666; font-size: 18px; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="icon">{icon}</div>
    <h1>{title}</h1>
    <p>{body}</p>
  </div>
</body>
</html>
"#
    );
    (status, Html(html))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
