use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};

type InFlight<T> = Shared<BoxFuture<'static, T>>;

/// Collapses concurrent identical requests into one shared computation.
///
/// The first caller for a key starts the producer; everyone arriving while it
/// runs awaits the same result, success or failure. The registration is
/// removed by the computation itself when it settles, so a failure never
/// leaves a key blocked.
pub struct RequestDeduplicator<T: Clone> {
    pending: Arc<Mutex<HashMap<String, InFlight<T>>>>,
}

impl<T> RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn deduplicate<F, Fut>(&self, key: &str, producer: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut pending = lock(&self.pending);
            match pending.get(key) {
                Some(in_flight) => {
                    tracing::trace!(target: "cache", key = %key, "joining in-flight request");
                    in_flight.clone()
                }
                None => {
                    let registry = Arc::clone(&self.pending);
                    let owned_key = key.to_string();
                    let fut = producer();
                    let in_flight = async move {
                        let result = fut.await;
                        lock(&registry).remove(&owned_key);
                        result
                    }
                    .boxed()
                    .shared();
                    pending.insert(key.to_string(), in_flight.clone());
                    in_flight
                }
            }
        };

        shared.await
    }

    /// Number of computations currently in flight.
    pub fn len(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.pending).clear();
    }
}

impl<T> Default for RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
