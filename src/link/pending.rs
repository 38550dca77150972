use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use tokio::sync::watch;

use crate::types::LinkOutcome;

struct Attempt {
    requester_id: String,
    outcome: watch::Sender<Option<LinkOutcome>>,
}

impl Attempt {
    fn is_settled(&self) -> bool {
        self.outcome.borrow().is_some()
    }
}

/// Linking attempts keyed by provider token.
///
/// Each attempt owns a single-assignment outcome slot. Whoever settles it
/// first wins; later [`try_settle`](Self::try_settle) calls are no-ops. A
/// settled attempt is no longer pending but keeps its outcome until
/// [`forget`](Self::forget) is called at the expiry deadline, so late
/// awaiters and late callbacks still see how it ended.
#[derive(Default)]
pub struct PendingAuthorizations {
    attempts: Mutex<HashMap<String, Attempt>>,
}

impl PendingAuthorizations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the token is already known.
    pub fn register(&self, token: &str, requester_id: &str) -> bool {
        let mut attempts = self.lock();
        if attempts.contains_key(token) {
            return false;
        }
        let (outcome, _) = watch::channel(None);
        attempts.insert(
            token.to_string(),
            Attempt {
                requester_id: requester_id.to_string(),
                outcome,
            },
        );
        true
    }

    pub fn is_pending(&self, token: &str) -> bool {
        self.lock().get(token).is_some_and(|a| !a.is_settled())
    }

    /// Requester of a still-pending attempt.
    pub fn requester(&self, token: &str) -> Option<String> {
        self.lock()
            .get(token)
            .filter(|a| !a.is_settled())
            .map(|a| a.requester_id.clone())
    }

    /// Requester of any known attempt, settled or not.
    pub fn owner(&self, token: &str) -> Option<String> {
        self.lock().get(token).map(|a| a.requester_id.clone())
    }

    /// Outcome of a settled attempt that has not been forgotten yet.
    pub fn outcome(&self, token: &str) -> Option<LinkOutcome> {
        self.lock()
            .get(token)
            .and_then(|a| (*a.outcome.borrow()).clone())
    }

    /// Settles the attempt unless it is unknown or already settled.
    /// Returns whether this call was the one that settled it.
    pub fn try_settle(&self, token: &str, outcome: LinkOutcome) -> bool {
        let attempts = self.lock();
        let Some(attempt) = attempts.get(token) else {
            return false;
        };

        attempt.outcome.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }

    pub fn subscribe(&self, token: &str) -> Option<watch::Receiver<Option<LinkOutcome>>> {
        self.lock().get(token).map(|a| a.outcome.subscribe())
    }

    pub fn forget(&self, token: &str) {
        self.lock().remove(token);
    }

    pub fn pending_count(&self) -> usize {
        self.lock().values().filter(|a| !a.is_settled()).count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Attempt>> {
        self.attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
