use tabled::Table;

use crate::{
    cli::App,
    error,
    management::UserStore,
    types::{Session, UserTableRow},
    warning,
};

/// Lists every linked account, sorted by requester.
pub async fn users() {
    let app = App::load().await;

    let mut records = match app.store.list_users().await {
        Ok(r) => r,
        Err(e) => error!("Cannot read users. Err: {}", e),
    };

    if records.is_empty() {
        warning!("No linked accounts yet.");
        return;
    }

    records.sort_by(|a, b| a.requester_id.cmp(&b.requester_id));

    let rows: Vec<UserTableRow> = records
        .into_iter()
        .map(|r| UserTableRow {
            requester: r.requester_id,
            username: r.session.username().to_string(),
            mode: match r.session {
                Session::ReadOnly { .. } => "read-only".to_string(),
                Session::Authorized(_) => "authorized".to_string(),
            },
            linked_at: r.linked_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();

    println!("{}", Table::new(rows));
}
