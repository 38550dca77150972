#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use utafm::{
    error::{ApiError, ApiResult, StoreError},
    link::{AuthProvider, LinkCoordinator, LinkSettings},
    management::{MemoryUserStore, UserStore},
    types::{AuthorizedSession, Session, UserRecord},
};

pub const CALLBACK_URL: &str = "http://localhost:3001/callback";

/// Provider whose tokens become exchangeable once [`authorize`] is called.
#[derive(Default)]
pub struct ScriptedProvider {
    issued: AtomicUsize,
    exchanges: AtomicUsize,
    authorized: Mutex<HashMap<String, String>>,
    exchange_delay: Mutex<Duration>,
    repeat_tokens: Mutex<bool>,
}

impl ScriptedProvider {
    /// Every `get_session` call takes `delay` before answering.
    pub fn delay_exchanges(&self, delay: Duration) {
        *self.exchange_delay.lock().unwrap() = delay;
    }

    /// `get_token` keeps handing out `token-1`.
    pub fn repeat_tokens(&self) {
        *self.repeat_tokens.lock().unwrap() = true;
    }

    pub fn authorize(&self, token: &str, username: &str) {
        self.authorized
            .lock()
            .unwrap()
            .insert(token.to_string(), username.to_string());
    }

    pub fn revoke(&self, token: &str) {
        self.authorized.lock().unwrap().remove(token);
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for ScriptedProvider {
    async fn get_token(&self) -> ApiResult<String> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.repeat_tokens.lock().unwrap() {
            return Ok("token-1".to_string());
        }
        Ok(format!("token-{n}"))
    }

    async fn get_session(&self, token: &str) -> ApiResult<AuthorizedSession> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        let delay = *self.exchange_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.authorized.lock().unwrap().get(token) {
            Some(username) => Ok(AuthorizedSession {
                username: username.clone(),
                session_key: format!("sk-{token}"),
            }),
            None => Err(ApiError::Provider {
                code: 14,
                message: "This token has not been authorized".to_string(),
            }),
        }
    }

    fn api_key(&self) -> &str {
        "KEY"
    }
}

pub fn settings() -> LinkSettings {
    LinkSettings {
        auth_url: "https://www.last.fm/api/auth/".to_string(),
        callback_url: Some(CALLBACK_URL.to_string()),
        expiry: Duration::from_secs(300),
        poll_interval: Duration::from_secs(3),
        max_alt_accounts: 2,
    }
}

pub struct Harness {
    pub provider: Arc<ScriptedProvider>,
    pub store: Arc<MemoryUserStore>,
    pub coordinator: LinkCoordinator,
}

pub fn harness() -> Harness {
    harness_with(settings())
}

pub fn harness_with(settings: LinkSettings) -> Harness {
    let provider = Arc::new(ScriptedProvider::default());
    let store = Arc::new(MemoryUserStore::new());
    let coordinator = LinkCoordinator::new(provider.clone(), store.clone(), settings);
    Harness {
        provider,
        store,
        coordinator,
    }
}

/// Coordinator over `store` with the scripted provider and default settings.
pub fn coordinator_over(store: Arc<dyn UserStore>) -> (Arc<ScriptedProvider>, LinkCoordinator) {
    let provider = Arc::new(ScriptedProvider::default());
    let coordinator = LinkCoordinator::new(provider.clone(), store, settings());
    (provider, coordinator)
}

pub fn authorized(username: &str, key: &str) -> AuthorizedSession {
    AuthorizedSession {
        username: username.to_string(),
        session_key: key.to_string(),
    }
}

/// Memory store that yields to the scheduler in the middle of counting, so
/// concurrent links interleave between the alt check and the save.
#[derive(Default)]
pub struct YieldingStore {
    inner: MemoryUserStore,
}

#[async_trait]
impl UserStore for YieldingStore {
    async fn find_user_session(&self, requester_id: &str) -> Result<Option<Session>, StoreError> {
        self.inner.find_user_session(requester_id).await
    }

    async fn save_user_session(
        &self,
        requester_id: &str,
        session: Session,
    ) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.inner.save_user_session(requester_id, session).await
    }

    async fn count_other_users_with_username(
        &self,
        username: &str,
        exclude_requester_id: &str,
    ) -> Result<usize, StoreError> {
        let count = self
            .inner
            .count_other_users_with_username(username, exclude_requester_id)
            .await;
        tokio::task::yield_now().await;
        count
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.inner.list_users().await
    }
}
