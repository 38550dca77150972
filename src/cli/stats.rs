use clap::ValueEnum;
use tabled::Table;

use crate::{
    cli::App,
    error,
    types::{TopTableRow, Track, TrackTableRow},
    utils::{Period, format_uts, pick_image_url},
    warning,
};

/// Which top list `utafm top` shows.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopKind {
    Artists,
    Albums,
    Tracks,
}

/// Prints the latest scrobbles of a user as a table.
///
/// `who` is looked up as a linked requester first and used as a Last.fm
/// username otherwise, so unlinked profiles can be inspected too. The cover
/// of the newest track is printed above the table when Last.fm has one.
///
/// # Arguments
///
/// * `who` - Linked requester or Last.fm username
/// * `limit` - Number of tracks to show
///
/// # Example Usage
///
/// ```bash
/// utafm recent requester-1 --limit 5
/// ```
pub async fn recent(who: &str, limit: u32) {
    let app = App::load().await;
    let username = app.resolve_username(who).await;

    let tracks = match app.lastfm.recent_tracks(&username, limit).await {
        Ok(t) => t,
        Err(e) => error!("Cannot load recent tracks for {}. Err: {}", username, e),
    };

    if tracks.is_empty() {
        warning!("{} has no scrobbles yet.", username);
        return;
    }

    if let Some(cover) = tracks.first().and_then(|t| pick_image_url(&t.image)) {
        println!("{cover}");
    }

    let rows: Vec<TrackTableRow> = tracks.into_iter().map(track_row).collect();
    println!("{}", Table::new(rows));
}

/// Prints a ranked top list of artists, albums or tracks.
///
/// # Arguments
///
/// * `who` - Linked requester or Last.fm username
/// * `kind` - Artists, albums or tracks
/// * `period` - Time range of the ranking
/// * `limit` - Number of entries to show
pub async fn top(who: &str, kind: TopKind, period: Period, limit: u32) {
    let app = App::load().await;
    let username = app.resolve_username(who).await;

    let result = match kind {
        TopKind::Artists => app
            .lastfm
            .top_artists(&username, period, limit)
            .await
            .map(|list| {
                list.into_iter()
                    .map(|a| (a.name, a.playcount))
                    .collect::<Vec<_>>()
            }),
        TopKind::Albums => app
            .lastfm
            .top_albums(&username, period, limit)
            .await
            .map(|list| {
                list.into_iter()
                    .map(|a| (format!("{} - {}", a.artist.name, a.name), a.playcount))
                    .collect()
            }),
        TopKind::Tracks => app
            .lastfm
            .top_tracks(&username, period, limit)
            .await
            .map(|list| {
                list.into_iter()
                    .map(|t| {
                        let plays = t.playcount.clone().unwrap_or_default();
                        (format!("{} - {}", t.artist.name, t.name), plays)
                    })
                    .collect()
            }),
    };

    let entries = match result {
        Ok(e) => e,
        Err(e) => error!("Cannot load top list for {}. Err: {}", username, e),
    };

    if entries.is_empty() {
        warning!("Nothing in {}'s top list for {}.", username, period);
        return;
    }

    let rows: Vec<TopTableRow> = entries
        .into_iter()
        .enumerate()
        .map(|(i, (name, plays))| TopTableRow {
            rank: i + 1,
            name,
            plays,
        })
        .collect();
    println!("{}", Table::new(rows));
}

fn track_row(track: Track) -> TrackTableRow {
    let when = if track.is_now_playing() {
        "now playing".to_string()
    } else {
        track
            .date
            .as_ref()
            .map(|d| format_uts(&d.uts))
            .unwrap_or_default()
    };

    TrackTableRow {
        when,
        artist: track.artist.name,
        track: track.name,
        album: track.album.map(|a| a.title).unwrap_or_default(),
    }
}
