use std::collections::HashSet;

use futures::future::join_all;
use serde_json::Value;

use crate::{
    error::ApiResult,
    lastfm::LastFm,
    types::{Affinity, AffinityLevel, Listener, Subject, TopArtist, UserRecord, WhoKnows},
    utils::Period,
};

/// Top artists compared by [`LastFm::affinity`].
pub const AFFINITY_SAMPLE: u32 = 50;

impl LastFm {
    /// Per-user info for a who-knows subject, including `userplaycount`.
    pub async fn subject_info(&self, subject: &Subject, username: Option<&str>) -> ApiResult<Value> {
        match subject {
            Subject::Artist { artist } => self.artist_info(artist, username).await,
            Subject::Album { artist, album } => self.album_info(artist, album, username).await,
            Subject::Track { artist, track } => self.track_info(artist, track, username).await,
        }
    }

    /// Ranks `users` by their plays of `subject`.
    ///
    /// Every user is looked up concurrently through the cached read path,
    /// so requesters sharing one Last.fm account cost a single request.
    /// Users whose lookup fails or who have no plays are left out.
    ///
    /// # Arguments
    ///
    /// * `subject` - Artist, album or track to rank by
    /// * `users` - Linked users to consider
    ///
    /// # Returns
    ///
    /// The leaderboard, most plays first. Ties keep the order of `users`.
    pub async fn who_knows(&self, subject: &Subject, users: &[UserRecord]) -> WhoKnows {
        let lookups = users.iter().map(|user| async move {
            let username = user.session.username();
            match self.subject_info(subject, Some(username)).await {
                Ok(info) => Some((user, info)),
                Err(e) => {
                    tracing::debug!(target: "lastfm", username = %username, error = %e, "who-knows lookup failed");
                    None
                }
            }
        });
        let found: Vec<(&UserRecord, Value)> = join_all(lookups).await.into_iter().flatten().collect();

        let mut listeners: Vec<Listener> = found
            .iter()
            .filter_map(|(user, info)| {
                let playcount = user_playcount(info)?;
                (playcount > 0).then(|| Listener {
                    requester_id: user.requester_id.clone(),
                    username: user.session.username().to_string(),
                    playcount,
                })
            })
            .collect();
        listeners.sort_by(|a, b| b.playcount.cmp(&a.playcount));

        let reference = found
            .iter()
            .find(|(user, _)| listeners.iter().any(|l| l.requester_id == user.requester_id))
            .map(|(_, info)| info);

        WhoKnows {
            name: reference
                .and_then(|info| info.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| subject.label()),
            url: reference
                .and_then(|info| info.get("url"))
                .and_then(Value::as_str)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            listeners,
        }
    }

    /// Compares the all-time top artists of two Last.fm users.
    pub async fn affinity(&self, first: &str, second: &str) -> ApiResult<Affinity> {
        let (a, b) = futures::try_join!(
            self.top_artists(first, Period::Overall, AFFINITY_SAMPLE),
            self.top_artists(second, Period::Overall, AFFINITY_SAMPLE),
        )?;
        Ok(compare_top_artists(&a, &b, AFFINITY_SAMPLE))
    }
}

/// Artists present in both lists, matched case-insensitively.
pub fn compare_top_artists(first: &[TopArtist], second: &[TopArtist], sample: u32) -> Affinity {
    let theirs: HashSet<String> = second.iter().map(|a| a.name.to_lowercase()).collect();

    let mut seen = HashSet::new();
    let common: Vec<String> = first
        .iter()
        .filter(|a| {
            let key = a.name.to_lowercase();
            theirs.contains(&key) && seen.insert(key)
        })
        .map(|a| a.name.clone())
        .collect();

    let similarity = if sample == 0 {
        0
    } else {
        ((common.len() as f64 / f64::from(sample)) * 100.0).round() as u32
    };

    Affinity {
        level: AffinityLevel::from_shared(common.len()),
        similarity,
        common,
    }
}

/// `userplaycount` sits under `stats` for artists and at the top level for
/// albums and tracks, as a string or a number.
fn user_playcount(info: &Value) -> Option<u64> {
    let value = info
        .pointer("/stats/userplaycount")
        .or_else(|| info.get("userplaycount"))?;
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}
