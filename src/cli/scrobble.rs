use chrono::Utc;

use crate::{
    cli::App,
    error,
    success,
    types::{AuthorizedSession, Scrobble, Session},
};

fn write_session(requester: &str, session: &Session) -> AuthorizedSession {
    match session.authorized() {
        Ok(s) => s.clone(),
        Err(e) => error!("{} ({}). Run `utafm link {}` to authorize.", e, requester, requester),
    }
}

/// Scrobbles a track for a requester with an authorized link.
///
/// Read-only links end the process with a hint to run `utafm link`.
///
/// # Arguments
///
/// * `requester` - Linked requester scrobbling the play
/// * `artist` - Artist name
/// * `track` - Track title
/// * `album` - Optional album title
/// * `timestamp` - Unix time the play started, defaults to now
///
/// # Example Usage
///
/// ```bash
/// utafm scrobble requester-1 --artist Boris --track Farewell --album Pink
/// ```
pub async fn scrobble(
    requester: &str,
    artist: String,
    track: String,
    album: Option<String>,
    timestamp: Option<i64>,
) {
    let app = App::load().await;
    let session = write_session(requester, &app.session_of(requester).await);

    let play = Scrobble {
        artist,
        track,
        timestamp: timestamp.unwrap_or_else(|| Utc::now().timestamp()),
        album,
        album_artist: None,
    };

    match app.lastfm.scrobble(&session, &play).await {
        Ok(0) => error!("Last.fm ignored the scrobble for {} - {}.", play.artist, play.track),
        Ok(_) => success!("Scrobbled {} - {}.", play.artist, play.track),
        Err(e) => error!("Cannot scrobble. Err: {}", e),
    }
}

/// Sets the track a requester is listening to right now.
pub async fn now_playing(requester: &str, artist: String, track: String, album: Option<String>) {
    let app = App::load().await;
    let session = write_session(requester, &app.session_of(requester).await);

    let play = Scrobble {
        artist,
        track,
        timestamp: Utc::now().timestamp(),
        album,
        album_artist: None,
    };

    match app.lastfm.update_now_playing(&session, &play).await {
        Ok(()) => success!("Now playing {} - {}.", play.artist, play.track),
        Err(e) => error!("Cannot update now playing. Err: {}", e),
    }
}

/// Loves a track on the requester's Last.fm account.
pub async fn love(requester: &str, artist: &str, track: &str) {
    let app = App::load().await;
    let session = write_session(requester, &app.session_of(requester).await);

    match app.lastfm.love_track(&session, artist, track).await {
        Ok(()) => success!("Loved {} - {}.", artist, track),
        Err(e) => error!("Cannot love track. Err: {}", e),
    }
}

pub async fn unlove(requester: &str, artist: &str, track: &str) {
    let app = App::load().await;
    let session = write_session(requester, &app.session_of(requester).await);

    match app.lastfm.unlove_track(&session, artist, track).await {
        Ok(()) => success!("Removed {} - {} from loved tracks.", artist, track),
        Err(e) => error!("Cannot unlove track. Err: {}", e),
    }
}
