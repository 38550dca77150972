//! # Last.fm Module
//!
//! Access to the Last.fm web service (`ws.audioscrobbler.com/2.0`).
//!
//! - [`client`]: stateless HTTP transport. Builds parameter sets, signs them
//!   and classifies every response into JSON or a typed [`crate::error::ApiError`].
//! - [`signature`]: the MD5 `api_sig` scheme.
//! - [`retry`]: bounded exponential backoff for transient failures.
//! - [`api`]: [`LastFm`], the cached and deduplicated facade the rest of the
//!   crate talks to. It also implements [`crate::link::AuthProvider`].
//! - [`social`]: who-knows leaderboards across linked users and taste
//!   affinity between two users, built on the cached reads.

pub mod api;
pub mod client;
pub mod retry;
pub mod signature;
pub mod social;

pub use api::LastFm;
pub use client::HttpMethod;
pub use client::LastFmClient;
pub use client::Params;
pub use client::params;
pub use retry::RetryPolicy;
pub use retry::with_retry;
pub use signature::sign;
pub use social::AFFINITY_SAMPLE;
pub use social::compare_top_artists;
