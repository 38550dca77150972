//! # API Module
//!
//! HTTP endpoints of the OAuth callback listener.
//!
//! - [`callback`] receives the Last.fm redirect after the user allowed
//!   access, completes the token exchange and settles the pending link.
//! - [`start_link`] and [`wait_link`] let a running listener host the whole
//!   linking flow, so its callback route, poller and finalizer share one
//!   set of pending attempts.
//! - [`health`] is a plain-text liveness probe.
//!
//! Every other path answers 404 via the router fallback in
//! [`crate::server::router`].

mod callback;
mod health;
mod link;

pub use callback::callback;
pub use callback::not_found;
pub use health::health;
pub use link::start_link;
pub use link::wait_link;
