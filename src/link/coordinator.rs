use std::{sync::Arc, time::Duration};

use reqwest::Url;
use tokio::{sync::Mutex, time::sleep};

use crate::{
    config::Config,
    error::LinkError,
    link::{AuthProvider, PendingAuthorizations},
    management::UserStore,
    types::{CompletionSource, LinkOutcome, LinkReport, LinkRequest, LinkResult, Session},
    utils::redact,
};

/// Knobs for the linking flow.
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub auth_url: String,
    pub callback_url: Option<String>,
    pub expiry: Duration,
    pub poll_interval: Duration,
    /// Other requesters allowed on the same Last.fm account.
    pub max_alt_accounts: usize,
}

impl LinkSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auth_url: config.auth_url.clone(),
            callback_url: config.callback_url.clone(),
            expiry: config.link_expiry,
            poll_interval: config.poll_interval,
            max_alt_accounts: config.max_alt_accounts,
        }
    }
}

/// What the callback endpoint managed to do with a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResult {
    Linked { username: String },
    /// Another producer already completed this attempt.
    AlreadyLinked { username: String },
    TooManyAccounts { username: String, other_accounts: usize },
}

/// Drives three-legged Last.fm authorization for chat users.
///
/// A linking attempt is settled exactly once by whichever of the callback
/// endpoint, the background poller or a manual confirmation completes the
/// token exchange first. Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct LinkCoordinator {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn UserStore>,
    pending: Arc<PendingAuthorizations>,
    /// Held across the alt-account check and the save that follows it.
    link_lock: Arc<Mutex<()>>,
    settings: LinkSettings,
}

impl LinkCoordinator {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        store: Arc<dyn UserStore>,
        settings: LinkSettings,
    ) -> Self {
        Self {
            provider,
            store,
            pending: Arc::new(PendingAuthorizations::new()),
            link_lock: Arc::new(Mutex::new(())),
            settings,
        }
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    pub fn pending(&self) -> &PendingAuthorizations {
        &self.pending
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Requests a fresh token, registers it and starts the expiry timer and
    /// the background poller. Never waits for the user.
    pub async fn start_link(&self, requester_id: &str) -> Result<LinkRequest, LinkError> {
        let token = self.provider.get_token().await?;
        let authorization_url = self.authorization_url(&token)?;

        if !self.pending.register(&token, requester_id) {
            tracing::warn!(target: "link", token = %redact(&token), "provider reissued a live token");
            return Ok(LinkRequest {
                token,
                authorization_url,
            });
        }
        self.spawn_expiry(token.clone());
        self.spawn_poller(token.clone());

        tracing::info!(
            target: "link",
            requester = %requester_id,
            token = %redact(&token),
            "authorization started"
        );

        Ok(LinkRequest {
            token,
            authorization_url,
        })
    }

    pub fn authorization_url(&self, token: &str) -> Result<String, LinkError> {
        let mut query = vec![("api_key", self.provider.api_key()), ("token", token)];
        if let Some(cb) = self.settings.callback_url.as_deref() {
            query.push(("cb", cb));
        }

        Url::parse_with_params(&self.settings.auth_url, &query)
            .map(String::from)
            .map_err(|e| LinkError::InvalidAuthorizationUrl(e.to_string()))
    }

    /// Starts a link that the coordinator finishes on its own: a background
    /// task waits for the outcome and persists a success. Used by the
    /// long-running listener, where no terminal is waiting on the attempt.
    pub async fn start_hosted_link(&self, requester_id: &str) -> Result<LinkRequest, LinkError> {
        let request = self.start_link(requester_id).await?;

        let coordinator = self.clone();
        let token = request.token.clone();
        let requester_id = requester_id.to_string();
        tokio::spawn(async move {
            match coordinator.complete_link(&token, &requester_id).await {
                Ok(report) => {
                    tracing::info!(target: "link", requester = %requester_id, ?report, "hosted link finished");
                }
                Err(e) => {
                    tracing::warn!(target: "link", requester = %requester_id, error = %e, "hosted link failed");
                }
            }
        });

        Ok(request)
    }

    /// Waits for the attempt on `token` and finishes it for its requester.
    pub async fn complete_link(
        &self,
        token: &str,
        requester_id: &str,
    ) -> Result<LinkReport, LinkError> {
        let outcome = self.await_completion(token).await?;
        self.finish_link(requester_id, outcome).await
    }

    /// Turns a settled outcome into a report, persisting a success through
    /// [`finalize_link`](Self::finalize_link). Calling it again for the
    /// same outcome yields the same report.
    pub async fn finish_link(
        &self,
        requester_id: &str,
        outcome: LinkOutcome,
    ) -> Result<LinkReport, LinkError> {
        let (session, source) = match outcome {
            LinkOutcome::Success { session, source } => (session, source),
            LinkOutcome::Failure => return Ok(LinkReport::Failed),
            LinkOutcome::TimedOut => return Ok(LinkReport::TimedOut),
        };

        let username = session.username.clone();
        let result = self
            .finalize_link(requester_id, Session::Authorized(session))
            .await?;

        Ok(match result {
            LinkResult::Linked => LinkReport::Linked { username, source },
            LinkResult::TooManyAccounts {
                username,
                other_accounts,
            } => LinkReport::TooManyAccounts {
                username,
                other_accounts,
            },
        })
    }

    /// Waits for the attempt to settle. Any number of callers may wait on the
    /// same token; all of them see the one outcome.
    pub async fn await_completion(&self, token: &str) -> Result<LinkOutcome, LinkError> {
        let mut rx = self
            .pending
            .subscribe(token)
            .ok_or(LinkError::ExpiredOrUnknownToken)?;

        match rx.wait_for(Option::is_some).await {
            Ok(outcome) => Ok((*outcome).clone().unwrap_or(LinkOutcome::TimedOut)),
            Err(_) => Ok(LinkOutcome::TimedOut),
        }
    }

    /// Settles `token` with `outcome` unless it is already settled.
    pub fn try_settle(&self, token: &str, outcome: LinkOutcome) -> bool {
        let settled = self.pending.try_settle(token, outcome);
        if settled {
            tracing::debug!(target: "link", token = %redact(token), "authorization settled");
        }
        settled
    }

    /// User-initiated exchange. Fails with [`LinkError::NotYetAuthorized`]
    /// without settling when the user has not allowed access yet.
    pub async fn confirm(&self, token: &str, requester_id: &str) -> Result<LinkOutcome, LinkError> {
        let owner = match self.pending.requester(token) {
            Some(owner) => owner,
            None => {
                return self
                    .pending
                    .outcome(token)
                    .ok_or(LinkError::ExpiredOrUnknownToken);
            }
        };
        if owner != requester_id {
            return Err(LinkError::RequesterMismatch);
        }

        match self.provider.get_session(token).await {
            Ok(session) => {
                self.try_settle(
                    token,
                    LinkOutcome::Success {
                        session,
                        source: CompletionSource::Manual,
                    },
                );
                self.pending
                    .outcome(token)
                    .ok_or(LinkError::ExpiredOrUnknownToken)
            }
            Err(e) => {
                tracing::debug!(target: "link", error = %e, "manual confirmation found no session yet");
                Err(LinkError::NotYetAuthorized)
            }
        }
    }

    /// Handles the provider redirect: exchanges the token, settles the
    /// attempt and, when this redirect is the producer that settled it,
    /// applies the alt-account policy and persists the link.
    ///
    /// The exchange runs without holding anything, so another producer or
    /// the expiry may settle the attempt meanwhile. In that case the redirect
    /// only reports the recorded outcome: `AlreadyLinked` after a success,
    /// [`LinkError::ExpiredOrUnknownToken`] after a failure or timeout.
    pub async fn complete_from_callback(&self, token: &str) -> Result<CallbackResult, LinkError> {
        let Some(requester_id) = self.pending.requester(token) else {
            return self.settled_callback(token);
        };

        let session = match self.provider.get_session(token).await {
            Ok(session) => session,
            Err(e) => {
                if self.try_settle(token, LinkOutcome::Failure) {
                    tracing::warn!(target: "callback", error = %e, "token exchange failed");
                    return Err(e.into());
                }
                return self.settled_callback(token);
            }
        };

        let won = self.try_settle(
            token,
            LinkOutcome::Success {
                session: session.clone(),
                source: CompletionSource::Callback,
            },
        );
        if !won {
            return self.settled_callback(token);
        }

        let username = session.username.clone();
        let result = self
            .finalize_link(&requester_id, Session::Authorized(session))
            .await?;

        Ok(match result {
            LinkResult::Linked => CallbackResult::Linked { username },
            LinkResult::TooManyAccounts {
                username,
                other_accounts,
            } => CallbackResult::TooManyAccounts {
                username,
                other_accounts,
            },
        })
    }

    fn settled_callback(&self, token: &str) -> Result<CallbackResult, LinkError> {
        match self.pending.outcome(token) {
            Some(LinkOutcome::Success { session, .. }) => Ok(CallbackResult::AlreadyLinked {
                username: session.username,
            }),
            _ => Err(LinkError::ExpiredOrUnknownToken),
        }
    }

    /// Applies the alt-account policy and persists the link on success.
    /// Relinking the same requester overwrites the earlier session.
    pub async fn finalize_link(
        &self,
        requester_id: &str,
        session: Session,
    ) -> Result<LinkResult, LinkError> {
        let username = session.username().to_string();
        let _guard = self.link_lock.lock().await;
        let other_accounts = self
            .store
            .count_other_users_with_username(&username, requester_id)
            .await?;

        if other_accounts > self.settings.max_alt_accounts {
            tracing::warn!(
                target: "link",
                requester = %requester_id,
                username = %username,
                other_accounts,
                "alt-account limit reached"
            );
            return Ok(LinkResult::TooManyAccounts {
                username,
                other_accounts,
            });
        }

        self.store.save_user_session(requester_id, session).await?;
        tracing::info!(
            target: "link",
            requester = %requester_id,
            username = %username,
            "linked Last.fm account"
        );
        Ok(LinkResult::Linked)
    }

    /// Links a username without authorization. The resulting session can read
    /// statistics but is rejected by every write call.
    pub async fn link_read_only(
        &self,
        requester_id: &str,
        username: &str,
    ) -> Result<Session, LinkError> {
        let session = Session::ReadOnly {
            username: username.trim().to_string(),
        };
        let _guard = self.link_lock.lock().await;
        self.store
            .save_user_session(requester_id, session.clone())
            .await?;
        tracing::info!(target: "link", requester = %requester_id, username = %username, "linked read-only");
        Ok(session)
    }

    pub async fn session_for(&self, requester_id: &str) -> Result<Option<Session>, LinkError> {
        Ok(self.store.find_user_session(requester_id).await?)
    }

    fn spawn_expiry(&self, token: String) {
        let pending = Arc::clone(&self.pending);
        let expiry = self.settings.expiry;
        tokio::spawn(async move {
            sleep(expiry).await;
            if pending.try_settle(&token, LinkOutcome::TimedOut) {
                tracing::info!(target: "link", token = %redact(&token), "authorization timed out");
            }
            pending.forget(&token);
        });
    }

    fn spawn_poller(&self, token: String) {
        let pending = Arc::clone(&self.pending);
        let provider = Arc::clone(&self.provider);
        let interval = self.settings.poll_interval;
        tokio::spawn(async move {
            loop {
                sleep(interval).await;
                if !pending.is_pending(&token) {
                    break;
                }

                match provider.get_session(&token).await {
                    Ok(session) => {
                        let outcome = LinkOutcome::Success {
                            session,
                            source: CompletionSource::Poll,
                        };
                        if pending.try_settle(&token, outcome) {
                            tracing::info!(target: "link", token = %redact(&token), "authorization detected by polling");
                        }
                        break;
                    }
                    Err(e) => {
                        tracing::trace!(target: "link", error = %e, "session not available yet");
                    }
                }
            }
        });
    }
}
