use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tabled::Tabled;

use crate::error::ApiError;

/// Credential granting write access to a Last.fm account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedSession {
    pub username: String,
    pub session_key: String,
}

/// A linked Last.fm account.
///
/// Write operations take an [`AuthorizedSession`], so a read-only link can
/// never reach them without going through [`Session::authorized`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Session {
    ReadOnly { username: String },
    Authorized(AuthorizedSession),
}

impl Session {
    pub fn username(&self) -> &str {
        match self {
            Session::ReadOnly { username } => username,
            Session::Authorized(s) => &s.username,
        }
    }

    pub fn is_write_capable(&self) -> bool {
        matches!(self, Session::Authorized(_))
    }

    pub fn authorized(&self) -> Result<&AuthorizedSession, ApiError> {
        match self {
            Session::Authorized(s) => Ok(s),
            Session::ReadOnly { .. } => Err(ApiError::Unauthorized),
        }
    }
}

impl From<AuthorizedSession> for Session {
    fn from(session: AuthorizedSession) -> Self {
        Session::Authorized(session)
    }
}

/// Stored link between a chat-platform user and a Last.fm account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub requester_id: String,
    pub session: Session,
    pub linked_at: DateTime<Utc>,
}

/// Returned by `start_link`: what the user has to open to authorize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRequest {
    pub token: String,
    pub authorization_url: String,
}

/// Which producer settled a pending authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionSource {
    Callback,
    Poll,
    Manual,
}

impl CompletionSource {
    pub fn describe(&self) -> &'static str {
        match self {
            CompletionSource::Callback => "Verified via redirect",
            CompletionSource::Poll => "Detected automatically",
            CompletionSource::Manual => "Manually confirmed",
        }
    }
}

/// Terminal state of a linking attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Success {
        session: AuthorizedSession,
        source: CompletionSource,
    },
    Failure,
    TimedOut,
}

impl LinkOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LinkOutcome::Success { .. })
    }
}

/// Result of applying the alt-account policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkResult {
    Linked,
    TooManyAccounts {
        username: String,
        other_accounts: usize,
    },
}

/// How a linking attempt ended once the alt-account policy was applied.
///
/// Served as JSON by `GET /link/wait`, so a CLI talking to a running
/// listener can report the same thing a local link does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkReport {
    Linked {
        username: String,
        source: CompletionSource,
    },
    TooManyAccounts {
        username: String,
        other_accounts: usize,
    },
    Failed,
    TimedOut,
}

/// Track submitted with `track.scrobble` or `track.updateNowPlaying`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scrobble {
    pub artist: String,
    pub track: String,
    pub timestamp: i64,
    pub album: Option<String>,
    pub album_artist: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Image {
    #[serde(rename = "#text", default)]
    pub url: String,
    #[serde(default)]
    pub size: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArtistRef {
    #[serde(alias = "#text", default)]
    pub name: String,
    pub mbid: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlbumRef {
    #[serde(rename = "#text", default)]
    pub title: String,
    pub mbid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrackAttr {
    pub nowplaying: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlayDate {
    #[serde(deserialize_with = "flexible_string")]
    pub uts: String,
    #[serde(rename = "#text", default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artist: ArtistRef,
    pub album: Option<AlbumRef>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub image: Vec<Image>,
    pub url: Option<String>,
    #[serde(default, deserialize_with = "optional_flexible_string")]
    pub playcount: Option<String>,
    #[serde(rename = "@attr")]
    pub attr: Option<TrackAttr>,
    pub date: Option<PlayDate>,
}

impl Track {
    pub fn is_now_playing(&self) -> bool {
        self.attr
            .as_ref()
            .and_then(|a| a.nowplaying.as_deref())
            .is_some_and(|v| v == "true")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopArtist {
    pub name: String,
    #[serde(default, deserialize_with = "flexible_string")]
    pub playcount: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub image: Vec<Image>,
    pub mbid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopAlbum {
    pub name: String,
    #[serde(default)]
    pub artist: ArtistRef,
    #[serde(default, deserialize_with = "flexible_string")]
    pub playcount: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub image: Vec<Image>,
    pub mbid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Registered {
    #[serde(default, deserialize_with = "flexible_string")]
    pub unixtime: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub realname: Option<String>,
    #[serde(default)]
    pub url: String,
    pub country: Option<String>,
    #[serde(default, deserialize_with = "flexible_string")]
    pub playcount: String,
    #[serde(default, deserialize_with = "optional_flexible_string")]
    pub artist_count: Option<String>,
    #[serde(default)]
    pub registered: Registered,
    #[serde(default, deserialize_with = "one_or_many")]
    pub image: Vec<Image>,
}

/// What a who-knows leaderboard is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Artist { artist: String },
    Album { artist: String, album: String },
    Track { artist: String, track: String },
}

impl Subject {
    pub fn label(&self) -> String {
        match self {
            Subject::Artist { artist } => artist.clone(),
            Subject::Album { artist, album } => format!("{album} by {artist}"),
            Subject::Track { artist, track } => format!("{track} by {artist}"),
        }
    }
}

/// A linked user with plays of a who-knows subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub requester_id: String,
    pub username: String,
    pub playcount: u64,
}

/// Linked users who listened to a subject, most plays first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoKnows {
    /// Name as Last.fm spells it, or the query when nobody has plays.
    pub name: String,
    pub url: Option<String>,
    pub listeners: Vec<Listener>,
}

/// Coarse taste overlap between two users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AffinityLevel {
    None,
    Low,
    Medium,
    High,
    VeryHigh,
    Super,
}

impl AffinityLevel {
    /// Level for the number of shared top artists.
    pub fn from_shared(shared: usize) -> Self {
        match shared {
            16.. => AffinityLevel::Super,
            11..=15 => AffinityLevel::VeryHigh,
            7..=10 => AffinityLevel::High,
            4..=6 => AffinityLevel::Medium,
            2..=3 => AffinityLevel::Low,
            _ => AffinityLevel::None,
        }
    }
}

impl std::fmt::Display for AffinityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AffinityLevel::None => "None",
            AffinityLevel::Low => "Low",
            AffinityLevel::Medium => "Medium",
            AffinityLevel::High => "High",
            AffinityLevel::VeryHigh => "Very High",
            AffinityLevel::Super => "Super",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affinity {
    /// Shared artists in the first user's ranking order.
    pub common: Vec<String>,
    pub level: AffinityLevel,
    /// Shared artists as a percentage of the compared sample.
    pub similarity: u32,
}

#[derive(Tabled)]
pub struct ListenerTableRow {
    pub rank: usize,
    pub requester: String,
    pub username: String,
    pub plays: u64,
}

#[derive(Tabled)]
pub struct UserTableRow {
    pub requester: String,
    pub username: String,
    pub mode: String,
    pub linked_at: String,
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub when: String,
    pub artist: String,
    pub track: String,
    pub album: String,
}

#[derive(Tabled)]
pub struct TopTableRow {
    pub rank: usize,
    pub name: String,
    pub plays: String,
}

/// Last.fm collapses single-element lists into a bare object.
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        None => Vec::new(),
    })
}

fn flexible_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_flexible_string(deserializer)?.unwrap_or_default())
}

fn optional_flexible_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
