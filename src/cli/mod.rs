//! # CLI Module
//!
//! Command implementations behind the `utafm` binary. Each command loads the
//! configuration, builds the pieces it needs through [`App`], and reports to
//! the terminal with the crate's colored output macros. Fatal problems end
//! the process through [`crate::error!`].
//!
//! ## Commands
//!
//! - [`serve`]: runs the listener (OAuth callback and hosted links) and the
//!   cache sweeper.
//! - [`link`]: links a requester to a Last.fm account, either through the
//!   browser authorization flow or read-only by username.
//! - [`users`]: lists linked accounts.
//! - [`recent`], [`top`]: listening statistics.
//! - [`who_knows`], [`affinity`]: comparisons across linked users.
//! - [`scrobble`], [`now_playing`], [`love`], [`unlove`]: write calls that
//!   need an authorized link.

mod link;
mod scrobble;
mod serve;
mod social;
mod stats;
mod users;

use std::sync::Arc;

use crate::{
    config::Config,
    error,
    lastfm::LastFm,
    link::{LinkCoordinator, LinkSettings},
    management::{JsonUserStore, UserStore},
    types::Session,
};

pub use link::link;
pub use scrobble::love;
pub use scrobble::now_playing;
pub use scrobble::scrobble;
pub use scrobble::unlove;
pub use serve::serve;
pub use social::SubjectKind;
pub use social::affinity;
pub use social::who_knows;
pub use stats::TopKind;
pub use stats::recent;
pub use stats::top;
pub use users::users;

/// Everything a command needs, wired from the environment.
pub struct App {
    pub config: Config,
    pub lastfm: Arc<LastFm>,
    pub store: Arc<JsonUserStore>,
}

impl App {
    /// Reads the configuration and opens the Last.fm client and the user
    /// store. Any failure ends the process with an error message.
    pub async fn load() -> Self {
        let config = match Config::from_env() {
            Ok(c) => c,
            Err(e) => error!("Invalid configuration. Err: {}", e),
        };

        let lastfm = match LastFm::from_config(&config) {
            Ok(l) => Arc::new(l),
            Err(e) => error!("Cannot create Last.fm client. Err: {}", e),
        };

        let store = match JsonUserStore::load(config.users_file.clone()).await {
            Ok(s) => Arc::new(s),
            Err(e) => error!(
                "Cannot load users from {}. Err: {}",
                config.users_file.display(),
                e
            ),
        };

        Self {
            config,
            lastfm,
            store,
        }
    }

    /// A fresh coordinator over this app's client and store. Pending links
    /// live in the coordinator, so each process has its own.
    pub fn coordinator(&self) -> LinkCoordinator {
        LinkCoordinator::new(
            self.lastfm.clone(),
            self.store.clone(),
            LinkSettings::from_config(&self.config),
        )
    }

    /// Resolves `who` as a linked requester first, then as a Last.fm username.
    pub async fn resolve_username(&self, who: &str) -> String {
        match self.store.find_user_session(who).await {
            Ok(Some(session)) => session.username().to_string(),
            Ok(None) => who.to_string(),
            Err(e) => error!("Cannot read users. Err: {}", e),
        }
    }

    /// Session of a linked requester; ends the process when there is none.
    pub async fn session_of(&self, requester: &str) -> Session {
        match self.store.find_user_session(requester).await {
            Ok(Some(session)) => session,
            Ok(None) => error!(
                "{} has no linked Last.fm account. Run `utafm link {}` first.",
                requester,
                requester
            ),
            Err(e) => error!("Cannot read users. Err: {}", e),
        }
    }
}
