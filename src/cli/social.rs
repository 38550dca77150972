use clap::ValueEnum;
use tabled::Table;

use crate::{
    cli::App,
    error,
    info,
    management::UserStore,
    success,
    types::{ListenerTableRow, Subject},
    utils::same_username,
    warning,
};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    Artist,
    Album,
    Track,
}

/// Shows which linked users listened to an artist, album or track.
///
/// Names left out are taken from what `requester` is playing right now.
///
/// # Arguments
///
/// * `kind` - Whether to rank by artist, album or track
/// * `artist` - Artist name
/// * `name` - Album or track title, ignored for artists
/// * `requester` - Linked requester whose now playing fills in missing names
pub async fn who_knows(
    kind: SubjectKind,
    artist: Option<String>,
    name: Option<String>,
    requester: Option<String>,
) {
    let app = App::load().await;

    let (artist, name) = match (artist, name, kind) {
        (Some(artist), _, SubjectKind::Artist) => (artist, None),
        (Some(artist), Some(name), _) => (artist, Some(name)),
        (_, _, _) => {
            let Some(requester) = requester else {
                error!("Give the names to look up, or --requester to use what they are playing.")
            };
            let username = app.resolve_username(&requester).await;
            match app.lastfm.now_playing(&username).await {
                Ok(Some(track)) => {
                    let name = match kind {
                        SubjectKind::Artist => None,
                        SubjectKind::Album => track.album.map(|a| a.title).filter(|t| !t.is_empty()),
                        SubjectKind::Track => Some(track.name),
                    };
                    (track.artist.name, name)
                }
                Ok(None) => error!("{} is not playing anything.", username),
                Err(e) => error!("Cannot load what {} is playing. Err: {}", username, e),
            }
        }
    };

    let subject = match (kind, name) {
        (SubjectKind::Artist, _) => Subject::Artist { artist },
        (SubjectKind::Album, Some(album)) => Subject::Album { artist, album },
        (SubjectKind::Track, Some(track)) => Subject::Track { artist, track },
        (_, None) => error!("The current track has no album. Pass --name explicitly."),
    };

    let users = match app.store.list_users().await {
        Ok(u) => u,
        Err(e) => error!("Cannot read users. Err: {}", e),
    };
    if users.is_empty() {
        warning!("Nobody has linked a Last.fm account yet.");
        return;
    }

    let board = app.lastfm.who_knows(&subject, &users).await;
    if board.listeners.is_empty() {
        warning!("Nobody has scrobbled {} yet.", subject.label());
        return;
    }

    info!("Who knows {}?", board.name);
    if let Some(url) = &board.url {
        println!("{url}");
    }

    let total = board.listeners.len();
    let rows: Vec<ListenerTableRow> = board
        .listeners
        .into_iter()
        .enumerate()
        .map(|(i, l)| ListenerTableRow {
            rank: i + 1,
            requester: l.requester_id,
            username: l.username,
            plays: l.playcount,
        })
        .collect();
    println!("{}", Table::new(rows));
    info!("Total: {} listeners", total);
}

/// Compares the taste of two linked requesters or Last.fm usernames.
pub async fn affinity(first: &str, second: &str) {
    let app = App::load().await;
    let a = app.resolve_username(first).await;
    let b = app.resolve_username(second).await;

    if same_username(&a, &b) {
        error!("Cannot compare {} with themselves.", a);
    }

    let affinity = match app.lastfm.affinity(&a, &b).await {
        Ok(r) => r,
        Err(e) => error!("Cannot compare {} and {}. Err: {}", a, b, e),
    };

    success!(
        "{} vs {}: affinity {} ({}% overall similarity)",
        a,
        b,
        affinity.level,
        affinity.similarity
    );

    let shown: Vec<&str> = affinity.common.iter().take(10).map(String::as_str).collect();
    if shown.is_empty() {
        info!("Common artists: none");
    } else if affinity.common.len() > shown.len() {
        info!(
            "Common artists: {} and {} more",
            shown.join(", "),
            affinity.common.len() - shown.len()
        );
    } else {
        info!("Common artists: {}", shown.join(", "));
    }
}
