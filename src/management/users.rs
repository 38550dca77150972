use std::{collections::HashMap, path::PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    error::StoreError,
    types::{Session, UserRecord},
    utils,
};

/// Persistence the linking flow relies on.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_session(&self, requester_id: &str) -> Result<Option<Session>, StoreError>;

    /// Stores `session` for `requester_id`, replacing any earlier link.
    async fn save_user_session(&self, requester_id: &str, session: Session)
    -> Result<(), StoreError>;

    /// Number of requesters other than `exclude_requester_id` linked to
    /// `username`, compared case-insensitively.
    async fn count_other_users_with_username(
        &self,
        username: &str,
        exclude_requester_id: &str,
    ) -> Result<usize, StoreError>;

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;
}

fn count_others<'a>(
    records: impl Iterator<Item = &'a UserRecord>,
    username: &str,
    exclude_requester_id: &str,
) -> usize {
    records
        .filter(|r| r.requester_id != exclude_requester_id)
        .filter(|r| utils::same_username(r.session.username(), username))
        .count()
}

fn new_record(requester_id: &str, session: Session) -> UserRecord {
    UserRecord {
        requester_id: requester_id.to_string(),
        session,
        linked_at: Utc::now(),
    }
}

/// Process-local store, used by tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_user_session(&self, requester_id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self
            .users
            .lock()
            .await
            .get(requester_id)
            .map(|r| r.session.clone()))
    }

    async fn save_user_session(
        &self,
        requester_id: &str,
        session: Session,
    ) -> Result<(), StoreError> {
        self.users
            .lock()
            .await
            .insert(requester_id.to_string(), new_record(requester_id, session));
        Ok(())
    }

    async fn count_other_users_with_username(
        &self,
        username: &str,
        exclude_requester_id: &str,
    ) -> Result<usize, StoreError> {
        let users = self.users.lock().await;
        Ok(count_others(users.values(), username, exclude_requester_id))
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.users.lock().await.values().cloned().collect())
    }
}

/// Store backed by a pretty-printed JSON file keyed by requester id.
///
/// The whole file is rewritten on every save while the lock is held, so
/// concurrent saves cannot interleave. A save that fails to reach the disk
/// leaves the in-memory view untouched.
pub struct JsonUserStore {
    path: PathBuf,
    users: Mutex<HashMap<String, UserRecord>>,
}

impl JsonUserStore {
    /// Opens the store, starting empty when the file does not exist yet.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let users = match async_fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };

        Ok(Self {
            path,
            users: Mutex::new(users),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn persist(&self, users: &HashMap<String, UserRecord>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(users)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for JsonUserStore {
    async fn find_user_session(&self, requester_id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self
            .users
            .lock()
            .await
            .get(requester_id)
            .map(|r| r.session.clone()))
    }

    async fn save_user_session(
        &self,
        requester_id: &str,
        session: Session,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        let mut updated = users.clone();
        updated.insert(requester_id.to_string(), new_record(requester_id, session));

        // memory only changes once the file does
        self.persist(&updated).await?;
        *users = updated;
        Ok(())
    }

    async fn count_other_users_with_username(
        &self,
        username: &str,
        exclude_requester_id: &str,
    ) -> Result<usize, StoreError> {
        let users = self.users.lock().await;
        Ok(count_others(users.values(), username, exclude_requester_id))
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.users.lock().await.values().cloned().collect())
    }
}
