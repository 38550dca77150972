use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::{CacheTtls, Config},
    error::{ApiError, ApiResult},
    lastfm::{
        client::{HttpMethod, LastFmClient, Params, params},
        retry::{RetryPolicy, with_retry},
    },
    link::AuthProvider,
    management::{MemoryCache, RequestDeduplicator, cache_key},
    types::{AuthorizedSession, Scrobble, TopAlbum, TopArtist, Track, UserInfo},
    utils::Period,
};

/// Last.fm access with caching, in-flight collapsing and retries for reads,
/// and signed calls for auth and writes.
pub struct LastFm {
    client: LastFmClient,
    cache: Arc<MemoryCache<Value>>,
    in_flight: RequestDeduplicator<ApiResult<Value>>,
    retry: RetryPolicy,
    ttls: CacheTtls,
}

impl LastFm {
    /// Wraps `client` with a cache of at most `max_entries` responses.
    ///
    /// Entries without an explicit TTL live for `ttls.default`.
    pub fn new(client: LastFmClient, ttls: CacheTtls, max_entries: usize) -> Self {
        let cache = Arc::new(MemoryCache::new(Some(ttls.default), max_entries));
        Self {
            client,
            cache,
            in_flight: RequestDeduplicator::new(),
            retry: RetryPolicy::default(),
            ttls,
        }
    }

    /// Builds the client and cache from the environment configuration.
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        let client = LastFmClient::from_config(config)?;
        Ok(Self::new(
            client,
            config.cache_ttls.clone(),
            config.cache_max_entries,
        ))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn client(&self) -> &LastFmClient {
        &self.client
    }

    pub fn cache(&self) -> &Arc<MemoryCache<Value>> {
        &self.cache
    }

    /// Cached read. Concurrent callers for the same parameters share one
    /// network request, retries included.
    pub async fn call(&self, params: Params, ttl: Option<Duration>) -> ApiResult<Value> {
        let key = cache_key(&params);
        if let Some(hit) = self.cache.get(&key) {
            tracing::trace!(target: "cache", key = %key, "cache hit");
            return Ok(hit);
        }

        let client = self.client.clone();
        let cache = Arc::clone(&self.cache);
        let retry = self.retry;
        let cache_key = key.clone();

        self.in_flight
            .deduplicate(&key, move || async move {
                let value = with_retry(retry, || client.request(&params)).await?;
                cache.set(&cache_key, value.clone(), ttl);
                Ok(value)
            })
            .await
    }

    /// Retrieves the most recent scrobbles of a Last.fm user.
    ///
    /// Calls `user.getrecenttracks` through the cached read path. The answer
    /// is kept for the "recent" TTL, so repeated lookups within a minute hit
    /// the cache. A track that is playing right now comes first and carries
    /// `@attr.nowplaying`.
    ///
    /// # Arguments
    ///
    /// * `user` - Last.fm username
    /// * `limit` - Maximum number of tracks to return
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(Vec<Track>)` - Newest first; empty when the user has no scrobbles
    /// - `Err(ApiError)` - `NotFound` for an unknown user, or a transport error
    ///   that survived the retries
    ///
    /// # Example
    ///
    /// ```
    /// let tracks = lastfm.recent_tracks("alice", 10).await?;
    /// for track in tracks {
    ///     println!("{} - {}", track.artist.name, track.name);
    /// }
    /// ```
    pub async fn recent_tracks(&self, user: &str, limit: u32) -> ApiResult<Vec<Track>> {
        let limit = limit.to_string();
        let data = self
            .call(
                params([
                    ("method", "user.getrecenttracks"),
                    ("user", user),
                    ("limit", limit.as_str()),
                ]),
                Some(self.ttls.recent),
            )
            .await?;
        extract_list(&data, "recenttracks", "track")
    }

    /// The newest scrobble of `user`, playing or not. `None` without any.
    pub async fn now_playing(&self, user: &str) -> ApiResult<Option<Track>> {
        Ok(self.recent_tracks(user, 1).await?.into_iter().next())
    }

    /// Retrieves the most played artists of a user over `period`.
    ///
    /// Top lists change slowly and are cached for the "top" TTL.
    ///
    /// # Arguments
    ///
    /// * `user` - Last.fm username
    /// * `period` - Time range the ranking covers
    /// * `limit` - Maximum number of artists to return
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(Vec<TopArtist>)` - Most played first; a single entry that
    ///   Last.fm sent as a bare object still comes back as a one-element list
    /// - `Err(ApiError)` - Unknown user or a failed request
    ///
    /// # Example
    ///
    /// ```
    /// let artists = lastfm.top_artists("alice", Period::Month, 5).await?;
    /// ```
    pub async fn top_artists(
        &self,
        user: &str,
        period: Period,
        limit: u32,
    ) -> ApiResult<Vec<TopArtist>> {
        let data = self.top("user.gettopartists", user, period, limit).await?;
        extract_list(&data, "topartists", "artist")
    }

    /// Most played tracks of `user` over `period`. See [`top_artists`](Self::top_artists).
    pub async fn top_tracks(&self, user: &str, period: Period, limit: u32) -> ApiResult<Vec<Track>> {
        let data = self.top("user.gettoptracks", user, period, limit).await?;
        extract_list(&data, "toptracks", "track")
    }

    /// Most played albums of `user` over `period`. See [`top_artists`](Self::top_artists).
    pub async fn top_albums(
        &self,
        user: &str,
        period: Period,
        limit: u32,
    ) -> ApiResult<Vec<TopAlbum>> {
        let data = self.top("user.gettopalbums", user, period, limit).await?;
        extract_list(&data, "topalbums", "album")
    }

    async fn top(&self, method: &str, user: &str, period: Period, limit: u32) -> ApiResult<Value> {
        let limit = limit.to_string();
        self.call(
            params([
                ("method", method),
                ("user", user),
                ("period", period.as_str()),
                ("limit", limit.as_str()),
            ]),
            Some(self.ttls.top),
        )
        .await
    }

    /// Profile of a Last.fm user, cached for the default TTL.
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(UserInfo)` - Name, total playcount, registration date and images
    /// - `Err(ApiError::NotFound)` - The user does not exist
    pub async fn user_info(&self, user: &str) -> ApiResult<UserInfo> {
        let data = self
            .call(params([("method", "user.getinfo"), ("user", user)]), None)
            .await?;
        let user_value = data
            .get("user")
            .cloned()
            .ok_or_else(|| ApiError::NotFound(user.to_string()))?;
        parse(user_value)
    }

    /// Retrieves artist metadata, optionally with one user's playcount.
    ///
    /// Metadata barely changes and is cached for the "metadata" TTL. Each
    /// `username` is its own cache entry, so who-knows lookups for different
    /// users never share an answer while lookups for the same user do.
    ///
    /// # Arguments
    ///
    /// * `artist` - Artist name as typed; Last.fm corrects the spelling
    /// * `username` - Adds `stats.userplaycount` for this user
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(Value)` - The raw `artist` object
    /// - `Err(ApiError)` - `NotFound` for an unknown artist, or a failed request
    pub async fn artist_info(&self, artist: &str, username: Option<&str>) -> ApiResult<Value> {
        self.info(
            params([
                ("method", "artist.getinfo"),
                ("artist", artist),
                ("username", username.unwrap_or_default()),
            ]),
            "artist",
        )
        .await
    }

    /// Album metadata; with `username` it carries `userplaycount`.
    pub async fn album_info(
        &self,
        artist: &str,
        album: &str,
        username: Option<&str>,
    ) -> ApiResult<Value> {
        self.info(
            params([
                ("method", "album.getinfo"),
                ("artist", artist),
                ("album", album),
                ("username", username.unwrap_or_default()),
            ]),
            "album",
        )
        .await
    }

    /// Track metadata; with `username` it carries `userplaycount`.
    pub async fn track_info(
        &self,
        artist: &str,
        track: &str,
        username: Option<&str>,
    ) -> ApiResult<Value> {
        self.info(
            params([
                ("method", "track.getinfo"),
                ("artist", artist),
                ("track", track),
                ("username", username.unwrap_or_default()),
            ]),
            "track",
        )
        .await
    }

    async fn info(&self, params: Params, field: &str) -> ApiResult<Value> {
        let data = self.call(params, Some(self.ttls.metadata)).await?;
        data.get(field)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(field.to_string()))
    }

    /// Submits one scrobble.
    ///
    /// The play is posted as a signed batch of one (`track[0]`, `artist[0]`,
    /// `timestamp[0]`, ...). Writes are sent exactly once.
    ///
    /// # Arguments
    ///
    /// * `session` - Authorized session of the user scrobbling
    /// * `play` - Track, artist, start time and optional album
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(u32)` - Plays Last.fm accepted, 1 when it does not say
    /// - `Err(ApiError)` - The request failed or Last.fm rejected the session
    pub async fn scrobble(&self, session: &AuthorizedSession, play: &Scrobble) -> ApiResult<u32> {
        let timestamp = play.timestamp.to_string();
        let mut fields = params([
            ("method", "track.scrobble"),
            ("sk", session.session_key.as_str()),
            ("track[0]", play.track.as_str()),
            ("artist[0]", play.artist.as_str()),
            ("timestamp[0]", timestamp.as_str()),
        ]);
        if let Some(album) = &play.album {
            fields.insert("album[0]".to_string(), album.clone());
        }
        if let Some(album_artist) = &play.album_artist {
            fields.insert("albumArtist[0]".to_string(), album_artist.clone());
        }

        let data = self.client.request_signed(&fields, HttpMethod::Post).await?;
        let accepted = data
            .pointer("/scrobbles/@attr/accepted")
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .unwrap_or(1);
        Ok(u32::try_from(accepted).unwrap_or(u32::MAX))
    }

    /// Marks `play` as the track the session's user is listening to now.
    /// Sent once and never cached.
    pub async fn update_now_playing(
        &self,
        session: &AuthorizedSession,
        play: &Scrobble,
    ) -> ApiResult<()> {
        let mut fields = params([
            ("method", "track.updateNowPlaying"),
            ("sk", session.session_key.as_str()),
            ("track", play.track.as_str()),
            ("artist", play.artist.as_str()),
        ]);
        if let Some(album) = &play.album {
            fields.insert("album".to_string(), album.clone());
        }
        if let Some(album_artist) = &play.album_artist {
            fields.insert("albumArtist".to_string(), album_artist.clone());
        }

        self.client.request_signed(&fields, HttpMethod::Post).await?;
        Ok(())
    }

    /// Adds a track to the user's loved tracks.
    ///
    /// # Arguments
    ///
    /// * `session` - Authorized session of the user; read-only links cannot
    ///   produce one
    /// * `artist` - Artist name
    /// * `track` - Track title
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing:
    /// - `Ok(())` - Last.fm accepted the change
    /// - `Err(ApiError)` - The request failed; writes are never retried
    pub async fn love_track(
        &self,
        session: &AuthorizedSession,
        artist: &str,
        track: &str,
    ) -> ApiResult<()> {
        self.track_action("track.love", session, artist, track).await
    }

    /// Removes a track from the user's loved tracks. See [`love_track`](Self::love_track).
    pub async fn unlove_track(
        &self,
        session: &AuthorizedSession,
        artist: &str,
        track: &str,
    ) -> ApiResult<()> {
        self.track_action("track.unlove", session, artist, track)
            .await
    }

    async fn track_action(
        &self,
        method: &str,
        session: &AuthorizedSession,
        artist: &str,
        track: &str,
    ) -> ApiResult<()> {
        let fields = params([
            ("method", method),
            ("sk", session.session_key.as_str()),
            ("track", track),
            ("artist", artist),
        ]);
        self.client.request_signed(&fields, HttpMethod::Post).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for LastFm {
    async fn get_token(&self) -> ApiResult<String> {
        let fields = params([("method", "auth.getToken")]);
        let data = with_retry(self.retry, || {
            self.client.request_signed(&fields, HttpMethod::Get)
        })
        .await?;

        data.get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::MalformedResponse("Failed to get authentication token".into()))
    }

    async fn get_session(&self, token: &str) -> ApiResult<AuthorizedSession> {
        let fields = params([("method", "auth.getSession"), ("token", token)]);
        let data = self.client.request_signed(&fields, HttpMethod::Get).await?;

        let session = data
            .get("session")
            .ok_or_else(|| ApiError::MalformedResponse("Failed to get session key".into()))?;
        let field = |name: &str| {
            session
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ApiError::MalformedResponse(format!("session is missing '{name}'")))
        };

        Ok(AuthorizedSession {
            username: field("name")?,
            session_key: field("key")?,
        })
    }

    fn api_key(&self) -> &str {
        self.client.api_key()
    }
}

fn parse<T: DeserializeOwned>(value: Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|e| ApiError::MalformedResponse(e.to_string()))
}

/// Reads `value[outer][inner]` as a list, accepting a lone object and
/// treating a missing list as empty.
fn extract_list<T: DeserializeOwned>(value: &Value, outer: &str, inner: &str) -> ApiResult<Vec<T>> {
    let Some(items) = value.get(outer).and_then(|o| o.get(inner)) else {
        return Ok(Vec::new());
    };

    match items {
        Value::Array(list) => list.iter().cloned().map(parse).collect(),
        Value::Null => Ok(Vec::new()),
        single => Ok(vec![parse(single.clone())?]),
    }
}
